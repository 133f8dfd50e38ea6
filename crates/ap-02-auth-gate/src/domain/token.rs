//! Bearer credential format.
//!
//! `hex(claims JSON) "." hex(HMAC-SHA256(secret, hex(claims JSON)))`
//!
//! The MAC covers the hex text exactly as transmitted, so no
//! re-serialization happens before verification.

use serde::{Deserialize, Serialize};
use shared_types::{
    duration_ms, sign_hex, verify_hex, ErrorCode, Rejection, Role, SessionId, SigningKey,
    Timestamp, UserId,
};
use std::time::Duration;
use thiserror::Error;

/// Auth gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued credentials.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
    /// Clock skew tolerated on `exp` and `iat`.
    #[serde(with = "humantime_serde")]
    pub leeway: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(60 * 60),
            leeway: Duration::from_secs(5),
        }
    }
}

/// Signed claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: UserId,
    pub sid: SessionId,
    pub role: Role,
    /// Issued at, Unix ms.
    pub iat: Timestamp,
    /// Expires at, Unix ms.
    pub exp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token issued in the future")]
    NotYetValid,
}

impl From<TokenError> for Rejection {
    fn from(err: TokenError) -> Self {
        let code = match err {
            TokenError::Expired => ErrorCode::TokenExpired,
            TokenError::Malformed | TokenError::BadSignature | TokenError::NotYetValid => {
                ErrorCode::InvalidToken
            }
        };
        Rejection::new(code, err.to_string())
    }
}

/// Issues and verifies credentials under one server secret.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    secret: SigningKey,
    leeway_ms: u64,
}

impl TokenCodec {
    pub fn new(secret: SigningKey, leeway: Duration) -> Self {
        Self {
            secret,
            leeway_ms: duration_ms(leeway),
        }
    }

    /// Identity-provider side. The pipeline itself only verifies.
    pub fn issue(&self, claims: &TokenClaims) -> String {
        // Serializing plain strings and integers cannot fail.
        let json = serde_json::to_vec(claims).unwrap_or_default();
        let body = hex::encode(json);
        let mac = sign_hex(&self.secret, body.as_bytes());
        format!("{body}.{mac}")
    }

    /// MAC first, then claims, then time bounds.
    pub fn decode_and_verify(&self, token: &str, now: Timestamp) -> Result<TokenClaims, TokenError> {
        let (body, mac) = token.split_once('.').ok_or(TokenError::Malformed)?;
        if body.is_empty() || mac.is_empty() {
            return Err(TokenError::Malformed);
        }
        if !verify_hex(&self.secret, body.as_bytes(), mac) {
            return Err(TokenError::BadSignature);
        }
        let json = hex::decode(body).map_err(|_| TokenError::Malformed)?;
        let claims: TokenClaims =
            serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)?;

        if claims.iat > now.saturating_add(self.leeway_ms) {
            return Err(TokenError::NotYetValid);
        }
        if now >= claims.exp.saturating_add(self.leeway_ms) {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
