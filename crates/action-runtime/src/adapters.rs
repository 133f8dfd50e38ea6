//! # Cross-Stage Adapters
//!
//! Outbound ports of one stage implemented over another stage's service.
//! The ledger is the system of record, so both the score engine's activity
//! lookups and the leaderboard's ranking source read from it.

use ap_04_score_engine::ActivityRepository;
use ap_05_ledger::{LedgerApi, LedgerStore};
use ap_06_score_broadcast::RankingSource;
use async_trait::async_trait;
use shared_types::{ActionType, RankedScore, Rejection, Timestamp, UserId};
use std::sync::Arc;

/// Score-engine activity history, read from the ledger store.
pub struct LedgerActivity {
    store: Arc<dyn LedgerStore>,
}

impl LedgerActivity {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActivityRepository for LedgerActivity {
    async fn has_completion(
        &self,
        user: &UserId,
        completion_key: &str,
    ) -> Result<bool, Rejection> {
        Ok(self.store.has_completion(user, completion_key).await?)
    }

    async fn last_action_at(
        &self,
        user: &UserId,
        action: ActionType,
    ) -> Result<Option<Timestamp>, Rejection> {
        Ok(self.store.last_action_at(user, action).await?)
    }
}

/// Leaderboard standings straight from the ledger.
pub struct LedgerRanking {
    ledger: Arc<dyn LedgerApi>,
}

impl LedgerRanking {
    pub fn new(ledger: Arc<dyn LedgerApi>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl RankingSource for LedgerRanking {
    async fn standing(&self, user: &UserId) -> Result<RankedScore, Rejection> {
        let state = self.ledger.state(user).await?;
        let rank = self.ledger.rank_of(user).await?;
        Ok(RankedScore {
            user_id: user.clone(),
            score: state.current_score,
            rank,
        })
    }

    async fn top(&self, limit: usize) -> Result<Vec<RankedScore>, Rejection> {
        self.ledger.top(limit).await
    }
}
