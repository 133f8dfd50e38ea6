//! Inbound port.

use crate::domain::commit::CommitRequest;
use async_trait::async_trait;
use shared_types::{RankedScore, Rejection, ScoreTransaction, UserId, UserScoreState};

#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Atomically applies the delta and appends one transaction.
    async fn commit(&self, request: CommitRequest) -> Result<ScoreTransaction, Rejection>;

    /// Current state; a user with no transactions has an empty state.
    async fn state(&self, user: &UserId) -> Result<UserScoreState, Rejection>;

    /// Transactions in commit order.
    async fn history(&self, user: &UserId) -> Result<Vec<ScoreTransaction>, Rejection>;

    /// 1-based competition rank; users with no score rank after everyone.
    async fn rank_of(&self, user: &UserId) -> Result<u64, Rejection>;

    async fn top(&self, limit: usize) -> Result<Vec<RankedScore>, Rejection>;
}
