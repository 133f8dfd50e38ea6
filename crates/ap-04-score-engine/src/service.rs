//! # Score Engine Service
//!
//! Implements `ScoreEngineApi`.

use crate::domain::scoring::{compute_delta, ScoreAward, ScoreTable};
use crate::domain::strategy::StrategyRegistry;
use crate::ports::inbound::ScoreEngineApi;
use crate::ports::outbound::{ActivityRepository, ResourceRepository};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{
    duration_ms, retry_transient, ActionType, ErrorCode, Principal, Rejection, RetryPolicy,
    SharedClock,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub struct ScoreEngine {
    registry: StrategyRegistry,
    table: ScoreTable,
    resources: Arc<dyn ResourceRepository>,
    activity: Arc<dyn ActivityRepository>,
    clock: SharedClock,
    retry: RetryPolicy,
}

impl ScoreEngine {
    pub fn new(
        registry: StrategyRegistry,
        table: ScoreTable,
        resources: Arc<dyn ResourceRepository>,
        activity: Arc<dyn ActivityRepository>,
        clock: SharedClock,
    ) -> Self {
        Self {
            registry,
            table,
            resources,
            activity,
            clock,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn table(&self) -> &ScoreTable {
        &self.table
    }
}

#[async_trait]
impl ScoreEngineApi for ScoreEngine {
    async fn process(
        &self,
        action_type: ActionType,
        action_data: &Value,
        principal: &Principal,
    ) -> Result<ScoreAward, Rejection> {
        let strategy = self.registry.get(action_type).ok_or_else(|| {
            Rejection::invalid_request(format!("no strategy registered for {action_type}"))
        })?;
        let now = self.clock.now();

        // 1-2. Resource exists and principal may act on it.
        let resolved = retry_transient(&self.retry, "engine.resolve", || {
            strategy.resolve(action_data, principal, self.resources.as_ref())
        })
        .await?;

        // 3. Uniqueness.
        let completion_key = resolved.completion_key(action_type);
        if let Some(key) = &completion_key {
            let done = retry_transient(&self.retry, "engine.has_completion", || {
                self.activity.has_completion(&principal.id, key)
            })
            .await?;
            if done {
                debug!(user = %principal.id, key = %key, "Already completed");
                return Err(Rejection::new(
                    ErrorCode::AlreadyCompleted,
                    "action already completed for this resource",
                ));
            }
        }

        // 4. Cooldown.
        let cooldown = strategy.cooldown(&self.table);
        if let Some(cooldown) = cooldown {
            let last = retry_transient(&self.retry, "engine.last_action_at", || {
                self.activity.last_action_at(&principal.id, action_type)
            })
            .await?;
            if let Some(last) = last {
                let ready_at = last.saturating_add(duration_ms(cooldown));
                if now < ready_at {
                    return Err(Rejection::new(
                        ErrorCode::CooldownActive,
                        format!("{action_type} is on cooldown"),
                    )
                    .with_retry_after(Duration::from_millis(ready_at - now)));
                }
            }
        }

        // 5-6. Score from server-held facts only.
        let delta = compute_delta(&self.table, action_type, &resolved.facts, now);
        info!(
            user = %principal.id,
            action = %action_type,
            resource = resolved.resource_key.as_deref().unwrap_or("-"),
            delta,
            "Score computed"
        );
        Ok(ScoreAward {
            action_type,
            delta,
            resource_key: resolved.resource_key,
            completion_key,
            cooldown,
        })
    }
}
