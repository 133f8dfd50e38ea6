//! Commit request and ledger settings.

use serde::{Deserialize, Serialize};
use shared_types::{ActionType, Score, Timestamp, UserId};
use std::time::Duration;

/// One score change to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub user_id: UserId,
    pub action_type: ActionType,
    pub delta: Score,
    /// Recorded with the transaction; a second commit with the same key for
    /// the same user is rejected.
    pub completion_key: Option<String>,
    /// Minimum spacing since the user's last commit of this action type.
    pub cooldown: Option<Duration>,
    pub occurred_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Longest wait for a user's row lock before `CONCURRENT_MODIFICATION`.
    #[serde(with = "humantime_serde")]
    pub lock_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(250),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout.is_zero() {
            return Err("ledger.lock_timeout must be > 0".to_string());
        }
        Ok(())
    }
}
