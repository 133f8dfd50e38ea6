//! Inbound port.

use crate::domain::scoring::ScoreAward;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{ActionType, Principal, Rejection};

/// Zero-trust scoring.
#[async_trait]
pub trait ScoreEngineApi: Send + Sync {
    /// Validates preconditions in order and computes the delta. Never writes.
    async fn process(
        &self,
        action_type: ActionType,
        action_data: &Value,
        principal: &Principal,
    ) -> Result<ScoreAward, Rejection>;
}
