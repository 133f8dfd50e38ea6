//! # Transactional Ledger Service
//!
//! Implements `LedgerApi` over any `LedgerStore`, retrying the transient
//! failures (`CONCURRENT_MODIFICATION`, `STORE_UNAVAILABLE`).

use crate::domain::chain::verify_chain;
use crate::domain::commit::CommitRequest;
use crate::domain::errors::ChainViolation;
use crate::ports::inbound::LedgerApi;
use crate::ports::outbound::LedgerStore;
use async_trait::async_trait;
use shared_types::{
    retry_transient, RankedScore, Rejection, RetryPolicy, ScoreTransaction, UserId,
    UserScoreState,
};
use std::sync::Arc;
use tracing::info;

pub struct TransactionalLedger {
    store: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
}

impl TransactionalLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Audits one user's chain against their current state.
    pub async fn audit(&self, user: &UserId) -> Result<Result<(), ChainViolation>, Rejection> {
        let state = self.state(user).await?;
        let history = self.history(user).await?;
        Ok(verify_chain(&state, &history))
    }
}

#[async_trait]
impl LedgerApi for TransactionalLedger {
    async fn commit(&self, request: CommitRequest) -> Result<ScoreTransaction, Rejection> {
        let store = self.store.as_ref();
        let request = &request;
        let transaction = retry_transient(&self.retry, "ledger.commit", move || {
            let pending = store.apply(request);
            async move { pending.await.map_err(Rejection::from) }
        })
        .await?;
        info!(
            user = %transaction.user_id,
            tx = %transaction.id,
            action = %transaction.action_type,
            delta = transaction.score_delta,
            score = transaction.score_after,
            "Score committed"
        );
        Ok(transaction)
    }

    async fn state(&self, user: &UserId) -> Result<UserScoreState, Rejection> {
        let store = self.store.as_ref();
        let state = retry_transient(&self.retry, "ledger.state", move || {
            let pending = store.state(user);
            async move { pending.await.map_err(Rejection::from) }
        })
        .await?;
        Ok(state.unwrap_or_else(|| UserScoreState::empty(user.clone())))
    }

    async fn history(&self, user: &UserId) -> Result<Vec<ScoreTransaction>, Rejection> {
        let store = self.store.as_ref();
        retry_transient(&self.retry, "ledger.history", move || {
            let pending = store.history(user);
            async move { pending.await.map_err(Rejection::from) }
        })
        .await
    }

    async fn rank_of(&self, user: &UserId) -> Result<u64, Rejection> {
        let store = self.store.as_ref();
        let rank = retry_transient(&self.retry, "ledger.rank_of", move || {
            let pending = store.rank_of(user);
            async move { pending.await.map_err(Rejection::from) }
        })
        .await?;
        match rank {
            Some(rank) => Ok(rank),
            None => {
                let ranked = retry_transient(&self.retry, "ledger.ranked_users", move || {
                    let pending = store.ranked_users();
                    async move { pending.await.map_err(Rejection::from) }
                })
                .await?;
                Ok(ranked + 1)
            }
        }
    }

    async fn top(&self, limit: usize) -> Result<Vec<RankedScore>, Rejection> {
        let store = self.store.as_ref();
        retry_transient(&self.retry, "ledger.top", move || {
            let pending = store.top_scores(limit);
            async move { pending.await.map_err(Rejection::from) }
        })
        .await
    }
}
