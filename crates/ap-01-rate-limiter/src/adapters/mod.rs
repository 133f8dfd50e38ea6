//! # Adapters
//!
//! In-process implementation of the reputation source. The runtime feeds it
//! account registrations, committed actions, and violations.

use crate::domain::reputation::ReputationInputs;
use crate::ports::outbound::{ReputationRecorder, ReputationSource};
use async_trait::async_trait;
use dashmap::DashMap;
use shared_types::{Rejection, Timestamp, UserId};

#[derive(Debug, Default)]
pub struct InMemoryReputationSource {
    records: DashMap<UserId, ReputationInputs>,
}

impl InMemoryReputationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_account(&self, user: &UserId, created_at: Timestamp) {
        self.records.entry(user.clone()).or_default().account_created_at = Some(created_at);
    }

    pub fn set(&self, user: &UserId, inputs: ReputationInputs) {
        self.records.insert(user.clone(), inputs);
    }
}

impl ReputationRecorder for InMemoryReputationSource {
    fn record_success(&self, user: &UserId) {
        let mut record = self.records.entry(user.clone()).or_default();
        record.successful_actions = record.successful_actions.saturating_add(1);
    }

    fn record_violation(&self, user: &UserId) {
        let mut record = self.records.entry(user.clone()).or_default();
        record.prior_violations = record.prior_violations.saturating_add(1);
    }
}

#[async_trait]
impl ReputationSource for InMemoryReputationSource {
    async fn inputs(&self, user: &UserId) -> Result<ReputationInputs, Rejection> {
        Ok(self
            .records
            .get(user)
            .map(|record| *record)
            .unwrap_or_default())
    }
}
