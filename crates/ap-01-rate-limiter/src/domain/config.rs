//! Rate limit configuration.

use serde::{Deserialize, Serialize};
use shared_types::ActionType;
use std::collections::HashMap;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// `limit` events per sliding `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimit {
    pub limit: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl TierLimit {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }
}

/// Tier-4 settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Limit at neutral reputation (50).
    pub base: TierLimit,
    /// Floor for low-reputation users.
    pub min_limit: u32,
    /// How long a computed reputation stays valid. Defaults to a nightly
    /// recompute.
    #[serde(with = "humantime_serde")]
    pub recompute_interval: Duration,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            base: TierLimit::new(120, HOUR),
            min_limit: 10,
            recompute_interval: DAY,
        }
    }
}

/// Full rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Master switch. When off every check passes.
    pub enabled: bool,
    /// Tier 1, per source identity (client IP).
    pub global: TierLimit,
    /// Tier 2, per authenticated user.
    pub per_user: TierLimit,
    /// Tier 3. Action types without an entry skip this tier.
    pub per_action: HashMap<ActionType, TierLimit>,
    /// Tier 4.
    pub adaptive: AdaptiveConfig,
    /// Sources exempt from tier 1 (health checkers, internal callers).
    pub whitelist: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            global: TierLimit::new(300, MINUTE),
            per_user: TierLimit::new(60, MINUTE),
            per_action: HashMap::from([
                (ActionType::CompleteTask, TierLimit::new(30, HOUR)),
                (ActionType::DailyCheckIn, TierLimit::new(1, DAY)),
                (ActionType::PublishArticle, TierLimit::new(5, HOUR)),
            ]),
            adaptive: AdaptiveConfig::default(),
            whitelist: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Every configured tier has a non-zero limit and window.
    pub fn validate(&self) -> Result<(), String> {
        let mut tiers = vec![
            ("global".to_string(), self.global),
            ("per_user".to_string(), self.per_user),
            ("adaptive.base".to_string(), self.adaptive.base),
        ];
        tiers.extend(
            self.per_action
                .iter()
                .map(|(action, limit)| (format!("per_action.{action}"), *limit)),
        );
        for (name, tier) in tiers {
            if tier.limit == 0 {
                return Err(format!("rate_limit.{name}.limit must be > 0"));
            }
            if tier.window.is_zero() {
                return Err(format!("rate_limit.{name}.window must be > 0"));
            }
        }
        if self.adaptive.min_limit == 0 {
            return Err("rate_limit.adaptive.min_limit must be > 0".to_string());
        }
        Ok(())
    }
}
