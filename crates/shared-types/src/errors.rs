//! # Error Types
//!
//! The rejection taxonomy shared by every gate. A `Rejection` is terminal for
//! the request; only codes marked transient are eligible for bounded retry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Stable, machine-readable rejection code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimitExceeded,
    InvalidToken,
    TokenExpired,
    Forbidden,
    StaleRequest,
    ReplayAttack,
    InvalidSignature,
    ResourceNotFound,
    UnauthorizedResourceAccess,
    AlreadyCompleted,
    CooldownActive,
    ConcurrentModification,
    StoreUnavailable,
    /// Malformed payload or unknown action type.
    InvalidRequest,
    /// Invariant breach (e.g. score overflow). Never carries details.
    InternalError,
}

/// Pipeline stage that produced a rejection. Used for fraud-analysis logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Request,
    RateLimiter,
    AuthGate,
    SignatureVerifier,
    ScoreEngine,
    Ledger,
    Store,
    Internal,
}

impl Gate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::Request => "request",
            Gate::RateLimiter => "rate_limiter",
            Gate::AuthGate => "auth_gate",
            Gate::SignatureVerifier => "signature_verifier",
            Gate::ScoreEngine => "score_engine",
            Gate::Ledger => "ledger",
            Gate::Store => "store",
            Gate::Internal => "internal",
        }
    }
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::StaleRequest => "STALE_REQUEST",
            ErrorCode::ReplayAttack => "REPLAY_ATTACK",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::UnauthorizedResourceAccess => "UNAUTHORIZED_RESOURCE_ACCESS",
            ErrorCode::AlreadyCompleted => "ALREADY_COMPLETED",
            ErrorCode::CooldownActive => "COOLDOWN_ACTIVE",
            ErrorCode::ConcurrentModification => "CONCURRENT_MODIFICATION",
            ErrorCode::StoreUnavailable => "STORE_UNAVAILABLE",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Only store outages and lock contention may be retried automatically.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCode::StoreUnavailable | ErrorCode::ConcurrentModification
        )
    }

    pub fn gate(&self) -> Gate {
        match self {
            ErrorCode::RateLimitExceeded => Gate::RateLimiter,
            ErrorCode::InvalidToken | ErrorCode::TokenExpired | ErrorCode::Forbidden => {
                Gate::AuthGate
            }
            ErrorCode::StaleRequest | ErrorCode::ReplayAttack | ErrorCode::InvalidSignature => {
                Gate::SignatureVerifier
            }
            ErrorCode::ResourceNotFound
            | ErrorCode::UnauthorizedResourceAccess
            | ErrorCode::AlreadyCompleted
            | ErrorCode::CooldownActive => Gate::ScoreEngine,
            ErrorCode::ConcurrentModification => Gate::Ledger,
            ErrorCode::StoreUnavailable => Gate::Store,
            ErrorCode::InvalidRequest => Gate::Request,
            ErrorCode::InternalError => Gate::Internal,
        }
    }

    /// HTTP status the external surface answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::RateLimitExceeded => 429,
            ErrorCode::InvalidToken | ErrorCode::TokenExpired => 401,
            ErrorCode::Forbidden | ErrorCode::UnauthorizedResourceAccess => 403,
            ErrorCode::StaleRequest | ErrorCode::InvalidSignature | ErrorCode::InvalidRequest => {
                400
            }
            ErrorCode::ReplayAttack
            | ErrorCode::AlreadyCompleted
            | ErrorCode::CooldownActive
            | ErrorCode::ConcurrentModification => 409,
            ErrorCode::ResourceNotFound => 404,
            ErrorCode::StoreUnavailable => 503,
            ErrorCode::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed, terminal rejection returned by any gate.
///
/// `message` is user-visible and must never contain storage internals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct Rejection {
    pub code: ErrorCode,
    pub message: String,
    /// Present for rate limiting and cooldowns.
    pub retry_after: Option<Duration>,
}

impl Rejection {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn rate_limited(scope: &str, retry_after: Duration) -> Self {
        Self::new(
            ErrorCode::RateLimitExceeded,
            format!("rate limit exceeded ({scope})"),
        )
        .with_retry_after(retry_after)
    }

    pub fn store_unavailable() -> Self {
        Self::new(
            ErrorCode::StoreUnavailable,
            "backing store temporarily unavailable",
        )
    }

    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, "internal error")
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    pub fn is_transient(&self) -> bool {
        self.code.is_transient()
    }

    pub fn gate(&self) -> Gate {
        self.code.gate()
    }

    /// Whole seconds for the `retryAfter` hint, rounded up so a client never
    /// retries early.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|d| {
            let secs = d.as_secs();
            if d.subsec_nanos() > 0 {
                secs + 1
            } else {
                secs
            }
        })
    }
}
