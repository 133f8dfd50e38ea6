//! Outbound ports.
//!
//! The identity provider owns sessions; this gate only reads them.

use async_trait::async_trait;
use shared_types::{Permission, Rejection, SessionId, SigningKey, Timestamp, UserId};
use std::collections::HashSet;
use std::time::Duration;

/// What the identity provider knows about one session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: UserId,
    /// Per-session request signing secret.
    pub signing_key: SigningKey,
    /// Grants on top of the role's defaults.
    pub extra_permissions: HashSet<Permission>,
    /// Hard session end, independent of credential expiry.
    pub expires_at: Option<Timestamp>,
}

#[async_trait]
pub trait SessionDirectory: Send + Sync {
    async fn session(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, Rejection>;
}

/// Fast revocation set.
#[async_trait]
pub trait RevocationList: Send + Sync {
    async fn is_revoked(&self, session_id: &SessionId, now: Timestamp) -> Result<bool, Rejection>;

    /// Revokes for `ttl`, which should cover the remaining credential lifetime.
    async fn revoke(
        &self,
        session_id: &SessionId,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<(), Rejection>;
}
