//! Outbound ports.

use crate::domain::{FillToken, LeaderboardSnapshot};
use async_trait::async_trait;
use shared_types::{RankedScore, Rejection, UserId};

/// Low-latency cache in front of the ledger.
///
/// Fills are fenced against invalidation: take a `FillToken` before reading
/// the source, and a `put_*` with a token older than the latest
/// `invalidate_*` of that entry is discarded.
#[async_trait]
pub trait ScoreCache: Send + Sync {
    async fn user_score(&self, user: &UserId) -> Result<Option<RankedScore>, Rejection>;

    async fn user_fill_token(&self, user: &UserId) -> Result<FillToken, Rejection>;

    /// Returns whether the entry was kept.
    async fn put_user_score(
        &self,
        entry: &RankedScore,
        token: &FillToken,
    ) -> Result<bool, Rejection>;

    async fn invalidate_user(&self, user: &UserId) -> Result<(), Rejection>;

    async fn leaderboard(&self) -> Result<Option<LeaderboardSnapshot>, Rejection>;

    async fn leaderboard_fill_token(&self) -> Result<FillToken, Rejection>;

    /// Returns whether the snapshot was kept.
    async fn put_leaderboard(
        &self,
        snapshot: &LeaderboardSnapshot,
        token: &FillToken,
    ) -> Result<bool, Rejection>;

    async fn invalidate_leaderboard(&self) -> Result<(), Rejection>;
}

/// Authoritative standings, normally the ledger.
#[async_trait]
pub trait RankingSource: Send + Sync {
    /// Score and rank of one user. Users with no score get score 0.
    async fn standing(&self, user: &UserId) -> Result<RankedScore, Rejection>;

    async fn top(&self, limit: usize) -> Result<Vec<RankedScore>, Rejection>;
}
