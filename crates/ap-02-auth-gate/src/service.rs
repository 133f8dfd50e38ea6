//! # Auth Gate Service
//!
//! Implements `AuthGateApi`.

use crate::domain::token::{AuthConfig, TokenClaims, TokenCodec};
use crate::ports::inbound::AuthGateApi;
use crate::ports::outbound::{RevocationList, SessionDirectory};
use async_trait::async_trait;
use shared_types::{
    duration_ms, retry_transient, ErrorCode, Permission, Principal, Rejection, RetryPolicy, Role,
    SessionId, SharedClock, SigningKey, UserId,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct AuthGate {
    codec: TokenCodec,
    config: AuthConfig,
    sessions: Arc<dyn SessionDirectory>,
    revocations: Arc<dyn RevocationList>,
    clock: SharedClock,
    retry: RetryPolicy,
}

impl AuthGate {
    pub fn new(
        secret: SigningKey,
        config: AuthConfig,
        sessions: Arc<dyn SessionDirectory>,
        revocations: Arc<dyn RevocationList>,
        clock: SharedClock,
    ) -> Self {
        Self {
            codec: TokenCodec::new(secret, config.leeway),
            config,
            sessions,
            revocations,
            clock,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Issues a credential valid for the configured TTL. Used by the identity
    /// provider side (login) and by tests.
    pub fn issue_token(&self, user: &UserId, session_id: &SessionId, role: Role) -> String {
        let now = self.clock.now();
        self.codec.issue(&TokenClaims {
            sub: user.clone(),
            sid: session_id.clone(),
            role,
            iat: now,
            exp: now.saturating_add(duration_ms(self.config.token_ttl)),
        })
    }

    /// Logout. Revoked until any credential for the session would have expired.
    pub async fn revoke_session(&self, session_id: &SessionId) -> Result<(), Rejection> {
        let now = self.clock.now();
        let ttl = self.config.token_ttl + self.config.leeway;
        retry_transient(&self.retry, "auth.revoke", || {
            self.revocations.revoke(session_id, ttl, now)
        })
        .await
    }
}

fn invalid(message: &str) -> Rejection {
    Rejection::new(ErrorCode::InvalidToken, message)
}

#[async_trait]
impl AuthGateApi for AuthGate {
    async fn authenticate(&self, token: &str) -> Result<Principal, Rejection> {
        let now = self.clock.now();
        let claims = self.codec.decode_and_verify(token, now).map_err(|e| {
            debug!(error = %e, "Credential rejected");
            Rejection::from(e)
        })?;

        let revoked = retry_transient(&self.retry, "auth.is_revoked", || {
            self.revocations.is_revoked(&claims.sid, now)
        })
        .await?;
        if revoked {
            warn!(user = %claims.sub, session = %claims.sid, "Revoked session presented");
            return Err(invalid("session revoked"));
        }

        let record = retry_transient(&self.retry, "auth.session", || {
            self.sessions.session(&claims.sid)
        })
        .await?
        .ok_or_else(|| invalid("unknown session"))?;

        if record.user_id != claims.sub {
            warn!(
                user = %claims.sub,
                session = %claims.sid,
                owner = %record.user_id,
                "Credential subject does not own session"
            );
            return Err(invalid("session does not belong to subject"));
        }
        if record.expires_at.is_some_and(|at| now >= at) {
            return Err(Rejection::new(ErrorCode::TokenExpired, "session expired"));
        }

        let mut permissions = claims.role.default_permissions();
        permissions.extend(record.extra_permissions.iter().copied());

        Ok(Principal {
            id: claims.sub,
            role: claims.role,
            permissions,
            session_id: claims.sid,
            signing_key: record.signing_key,
        })
    }

    fn authorize(&self, principal: &Principal, permission: Permission) -> Result<(), Rejection> {
        if principal.has_permission(permission) {
            Ok(())
        } else {
            Err(Rejection::new(
                ErrorCode::Forbidden,
                format!("missing permission {permission:?}"),
            ))
        }
    }
}
