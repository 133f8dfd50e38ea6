//! # Rate Limiter Service
//!
//! Implements `RateLimiterApi` over the shared atomic store.

use crate::domain::config::{RateLimitConfig, TierLimit};
use crate::domain::reputation::{effective_limit, ReputationPolicy};
use crate::ports::inbound::RateLimiterApi;
use crate::ports::outbound::ReputationSource;
use async_trait::async_trait;
use dashmap::DashMap;
use shared_store::KeyValueStore;
use shared_types::{
    duration_ms, retry_transient, ActionType, Rejection, RetryPolicy, SharedClock, Timestamp,
    UserId,
};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct CachedReputation {
    score: u8,
    computed_at: Timestamp,
}

/// Four-tier sliding-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Arc<dyn KeyValueStore>,
    reputation_source: Arc<dyn ReputationSource>,
    policy: Arc<dyn ReputationPolicy>,
    clock: SharedClock,
    retry: RetryPolicy,
    reputation_cache: DashMap<UserId, CachedReputation>,
}

impl RateLimiter {
    pub fn new(
        config: RateLimitConfig,
        store: Arc<dyn KeyValueStore>,
        reputation_source: Arc<dyn ReputationSource>,
        policy: Arc<dyn ReputationPolicy>,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            store,
            reputation_source,
            policy,
            clock,
            retry: RetryPolicy::default(),
            reputation_cache: DashMap::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Drops the cached reputation so the next check recomputes it.
    pub fn invalidate_reputation(&self, user: &UserId) {
        self.reputation_cache.remove(user);
    }

    /// One sliding-window hit. Store failures are retried, then surface as
    /// `STORE_UNAVAILABLE`.
    async fn hit(
        &self,
        scope: &'static str,
        key: &str,
        tier: TierLimit,
        now: Timestamp,
    ) -> Result<(), Rejection> {
        let decision = retry_transient(&self.retry, "rate_limit.record_hit", || async {
            self.store
                .record_hit(key, tier.window, tier.limit, now)
                .await
                .map_err(Rejection::from)
        })
        .await?;

        if decision.allowed {
            return Ok(());
        }
        let retry_after = decision.retry_after.unwrap_or(tier.window);
        info!(
            scope,
            key,
            limit = tier.limit,
            count = decision.count,
            retry_after_ms = duration_ms(retry_after),
            "Rate limit exceeded"
        );
        Err(Rejection::rate_limited(scope, retry_after))
    }
}

#[async_trait]
impl RateLimiterApi for RateLimiter {
    async fn check_source(&self, source: &str) -> Result<(), Rejection> {
        if !self.config.enabled || self.config.whitelist.iter().any(|s| s == source) {
            return Ok(());
        }
        let now = self.clock.now();
        self.hit("global", &format!("rl:global:{source}"), self.config.global, now)
            .await
    }

    async fn check_principal(&self, user: &UserId, action: ActionType) -> Result<(), Rejection> {
        if !self.config.enabled {
            return Ok(());
        }
        let now = self.clock.now();

        self.hit("user", &format!("rl:user:{user}"), self.config.per_user, now)
            .await?;

        if let Some(tier) = self.config.per_action.get(&action) {
            self.hit("action", &format!("rl:action:{action}:{user}"), *tier, now)
                .await?;
        }

        let adaptive = &self.config.adaptive;
        let reputation = self.reputation(user).await?;
        let limit = effective_limit(adaptive.base.limit, reputation, adaptive.min_limit);
        self.hit(
            "adaptive",
            &format!("rl:adaptive:{user}"),
            TierLimit::new(limit, adaptive.base.window),
            now,
        )
        .await
    }

    async fn reputation(&self, user: &UserId) -> Result<u8, Rejection> {
        let now = self.clock.now();
        let interval = duration_ms(self.config.adaptive.recompute_interval);

        if let Some(cached) = self.reputation_cache.get(user).map(|entry| *entry) {
            if now.saturating_sub(cached.computed_at) < interval {
                return Ok(cached.score);
            }
        }

        let inputs = self.reputation_source.inputs(user).await?;
        let score = self.policy.score(&inputs, now);
        debug!(user = %user, score, "Reputation recomputed");
        self.reputation_cache.insert(
            user.clone(),
            CachedReputation {
                score,
                computed_at: now,
            },
        );
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryReputationSource;
    use crate::domain::reputation::{DefaultReputationPolicy, ReputationInputs};
    use crate::ports::inbound::RateLimitSubject;
    use crate::ports::outbound::ReputationRecorder;
    use shared_store::InMemoryStore;
    use shared_types::{ErrorCode, ManualClock};
    use std::collections::HashMap;
    use std::time::Duration;

    const T0: Timestamp = 1_700_000_000_000;

    struct Fixture {
        limiter: RateLimiter,
        clock: Arc<ManualClock>,
        store: Arc<InMemoryStore>,
        reputation: Arc<InMemoryReputationSource>,
    }

    fn fixture(config: RateLimitConfig) -> Fixture {
        let clock = Arc::new(ManualClock::new(T0));
        let store = Arc::new(InMemoryStore::new());
        let reputation = Arc::new(InMemoryReputationSource::new());
        let limiter = RateLimiter::new(
            config,
            store.clone(),
            reputation.clone(),
            Arc::new(DefaultReputationPolicy),
            clock.clone(),
        )
        .with_retry_policy(RetryPolicy::no_retry());
        Fixture {
            limiter,
            clock,
            store,
            reputation,
        }
    }

    fn loose() -> RateLimitConfig {
        RateLimitConfig {
            global: TierLimit::new(1_000, Duration::from_secs(60)),
            per_user: TierLimit::new(1_000, Duration::from_secs(60)),
            per_action: HashMap::new(),
            ..RateLimitConfig::default()
        }
    }

    fn user() -> UserId {
        UserId::new("alice")
    }

    #[tokio::test]
    async fn test_per_user_boundary_and_recovery() {
        let f = fixture(RateLimitConfig {
            per_user: TierLimit::new(3, Duration::from_secs(60)),
            ..loose()
        });
        for _ in 0..3 {
            f.limiter
                .check_principal(&user(), ActionType::CompleteTask)
                .await
                .unwrap();
        }
        let err = f
            .limiter
            .check_principal(&user(), ActionType::CompleteTask)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimitExceeded);
        assert_eq!(err.retry_after, Some(Duration::from_secs(60)));

        f.clock.advance(Duration::from_secs(60));
        assert!(f
            .limiter
            .check_principal(&user(), ActionType::CompleteTask)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_daily_check_in_cooldown() {
        let mut config = loose();
        config.per_action.insert(
            ActionType::DailyCheckIn,
            TierLimit::new(1, Duration::from_secs(24 * 3600)),
        );
        let f = fixture(config);

        f.limiter
            .check_principal(&user(), ActionType::DailyCheckIn)
            .await
            .unwrap();
        f.clock.advance(Duration::from_secs(3600));
        let err = f
            .limiter
            .check_principal(&user(), ActionType::DailyCheckIn)
            .await
            .unwrap_err();
        assert_eq!(err.retry_after, Some(Duration::from_secs(23 * 3600)));

        // Other action types are unaffected.
        assert!(f
            .limiter
            .check_principal(&user(), ActionType::CompleteTask)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_source_tier_and_whitelist() {
        let f = fixture(RateLimitConfig {
            global: TierLimit::new(2, Duration::from_secs(10)),
            whitelist: vec!["127.0.0.1".into()],
            ..loose()
        });
        f.limiter.check_source("10.0.0.1").await.unwrap();
        f.limiter.check_source("10.0.0.1").await.unwrap();
        assert!(f.limiter.check_source("10.0.0.1").await.is_err());
        assert!(f.limiter.check_source("10.0.0.2").await.is_ok());
        for _ in 0..10 {
            assert!(f.limiter.check_source("127.0.0.1").await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_full_check_fails_fast_on_source() {
        let f = fixture(RateLimitConfig {
            global: TierLimit::new(1, Duration::from_secs(10)),
            ..loose()
        });
        let subject = RateLimitSubject {
            source: "10.0.0.9".into(),
            user: user(),
            action: ActionType::CompleteTask,
        };
        f.limiter.check(&subject).await.unwrap();
        let err = f.limiter.check(&subject).await.unwrap_err();
        assert!(err.message.contains("global"));
    }

    #[tokio::test]
    async fn test_adaptive_limit_follows_reputation() {
        let mut config = loose();
        config.adaptive.base = TierLimit::new(4, Duration::from_secs(3600));
        config.adaptive.min_limit = 1;
        let f = fixture(config);

        let trusted = UserId::new("trusted");
        f.reputation.set(
            &trusted,
            ReputationInputs {
                account_created_at: Some(0),
                prior_violations: 0,
                successful_actions: 10_000,
            },
        );
        let shady = UserId::new("shady");
        f.reputation.set(
            &shady,
            ReputationInputs {
                prior_violations: 4,
                ..Default::default()
            },
        );

        assert_eq!(f.limiter.reputation(&trusted).await.unwrap(), 100);
        assert_eq!(f.limiter.reputation(&shady).await.unwrap(), 10);

        let mut trusted_ok = 0;
        let mut shady_ok = 0;
        for _ in 0..10 {
            if f
                .limiter
                .check_principal(&trusted, ActionType::CompleteTask)
                .await
                .is_ok()
            {
                trusted_ok += 1;
            }
            if f
                .limiter
                .check_principal(&shady, ActionType::CompleteTask)
                .await
                .is_ok()
            {
                shady_ok += 1;
            }
        }
        assert_eq!(trusted_ok, 8);
        assert_eq!(shady_ok, 1);
    }

    #[tokio::test]
    async fn test_reputation_is_cached_until_interval() {
        let f = fixture(loose());
        assert_eq!(f.limiter.reputation(&user()).await.unwrap(), 50);

        for _ in 0..3 {
            f.reputation.record_violation(&user());
        }
        assert_eq!(f.limiter.reputation(&user()).await.unwrap(), 50);

        f.clock.advance(Duration::from_secs(24 * 3600));
        assert_eq!(f.limiter.reputation(&user()).await.unwrap(), 20);

        f.reputation.record_violation(&user());
        f.limiter.invalidate_reputation(&user());
        assert_eq!(f.limiter.reputation(&user()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_disabled_passes_everything() {
        let f = fixture(RateLimitConfig {
            enabled: false,
            per_user: TierLimit::new(1, Duration::from_secs(60)),
            ..loose()
        });
        for _ in 0..5 {
            assert!(f
                .limiter
                .check_principal(&user(), ActionType::CompleteTask)
                .await
                .is_ok());
        }
    }

    #[tokio::test]
    async fn test_store_outage_is_transient() {
        let f = fixture(loose());
        f.store.set_available(false);
        let err = f.limiter.check_source("10.0.0.1").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StoreUnavailable);
        assert!(err.is_transient());
    }
}
