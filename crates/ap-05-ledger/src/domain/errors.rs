//! Ledger error types.

use shared_types::{ErrorCode, Rejection, UserId};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("row lock for {user} not acquired within {waited:?}")]
    ConcurrentModification { user: UserId, waited: Duration },

    #[error("completion {key} already recorded")]
    AlreadyCompleted { key: String },

    #[error("cooldown active for another {retry_after:?}")]
    CooldownActive { retry_after: Duration },

    #[error("score overflow for {user}")]
    Overflow { user: UserId },

    #[error("history append failed")]
    AppendFailed,

    #[error("ledger store unavailable")]
    Unavailable,
}

impl From<LedgerError> for Rejection {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ConcurrentModification { .. } => Rejection::new(
                ErrorCode::ConcurrentModification,
                "score is being updated concurrently",
            ),
            LedgerError::AlreadyCompleted { .. } => Rejection::new(
                ErrorCode::AlreadyCompleted,
                "action already completed for this resource",
            ),
            LedgerError::CooldownActive { retry_after } => {
                Rejection::new(ErrorCode::CooldownActive, "action is on cooldown")
                    .with_retry_after(retry_after)
            }
            LedgerError::Overflow { .. } => Rejection::internal(),
            LedgerError::AppendFailed | LedgerError::Unavailable => Rejection::store_unavailable(),
        }
    }
}

/// A break in a user's transaction chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainViolation {
    #[error("transaction {index} is unbalanced")]
    Unbalanced { index: usize },

    #[error("transaction {index} does not continue from its predecessor")]
    Broken { index: usize },

    #[error("transaction {index} belongs to another user")]
    ForeignUser { index: usize },

    #[error("history replays to {replayed}, state holds {current}")]
    ScoreMismatch { replayed: i64, current: i64 },
}
