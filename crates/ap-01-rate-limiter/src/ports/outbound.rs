//! Outbound port.

use crate::domain::reputation::ReputationInputs;
use async_trait::async_trait;
use shared_types::{Rejection, UserId};

/// Supplies the facts a reputation is computed from: account age, prior
/// violations, successful-action history.
#[async_trait]
pub trait ReputationSource: Send + Sync {
    async fn inputs(&self, user: &UserId) -> Result<ReputationInputs, Rejection>;
}

/// Feedback from the pipeline into the reputation history. Takes effect at
/// the next recompute, not immediately.
pub trait ReputationRecorder: Send + Sync {
    fn record_success(&self, user: &UserId);

    fn record_violation(&self, user: &UserId);
}
