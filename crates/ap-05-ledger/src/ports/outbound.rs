//! Outbound port: the durable store behind the ledger.

use crate::domain::commit::CommitRequest;
use crate::domain::errors::LedgerError;
use async_trait::async_trait;
use shared_types::{ActionType, RankedScore, ScoreTransaction, Timestamp, UserId, UserScoreState};

/// Row-locking transactional store.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Lock, re-check, recompute, append, update. All or nothing.
    async fn apply(&self, request: &CommitRequest) -> Result<ScoreTransaction, LedgerError>;

    async fn state(&self, user: &UserId) -> Result<Option<UserScoreState>, LedgerError>;

    async fn history(&self, user: &UserId) -> Result<Vec<ScoreTransaction>, LedgerError>;

    async fn has_completion(&self, user: &UserId, key: &str) -> Result<bool, LedgerError>;

    async fn last_action_at(
        &self,
        user: &UserId,
        action: ActionType,
    ) -> Result<Option<Timestamp>, LedgerError>;

    /// Highest scores first, ties by user id.
    async fn top_scores(&self, limit: usize) -> Result<Vec<RankedScore>, LedgerError>;

    /// `None` for users without a committed transaction.
    async fn rank_of(&self, user: &UserId) -> Result<Option<u64>, LedgerError>;

    /// Number of users with at least one transaction.
    async fn ranked_users(&self) -> Result<u64, LedgerError>;
}
