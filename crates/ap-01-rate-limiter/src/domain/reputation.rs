//! Reputation scoring for the adaptive tier.
//!
//! Reputation is a 0-100 trust score. 50 is neutral and maps to the base
//! limit; the adaptive limit scales linearly with it.

use shared_types::{ErrorCode, Timestamp};

pub const NEUTRAL_REPUTATION: u8 = 50;
pub const MAX_REPUTATION: u8 = 100;

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Raw facts a reputation is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReputationInputs {
    /// `None` when the account directory has no record.
    pub account_created_at: Option<Timestamp>,
    pub prior_violations: u32,
    pub successful_actions: u64,
}

impl ReputationInputs {
    pub fn account_age_days(&self, now: Timestamp) -> u64 {
        self.account_created_at
            .map_or(0, |created| now.saturating_sub(created) / DAY_MS)
    }
}

/// Pluggable scoring policy.
pub trait ReputationPolicy: Send + Sync {
    /// Reputation in `0..=100`.
    fn score(&self, inputs: &ReputationInputs, now: Timestamp) -> u8;
}

/// `50 + age bonus + history bonus - 10 per violation`, clamped to 0..=100.
///
/// The age bonus reaches its cap of 20 after a year; the history bonus
/// reaches its cap of 30 after 300 successful actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultReputationPolicy;

impl ReputationPolicy for DefaultReputationPolicy {
    fn score(&self, inputs: &ReputationInputs, now: Timestamp) -> u8 {
        let age_bonus = (inputs.account_age_days(now) / 18).min(20) as i64;
        let history_bonus = (inputs.successful_actions / 10).min(30) as i64;
        let penalty = i64::from(inputs.prior_violations).saturating_mul(10);
        let raw = i64::from(NEUTRAL_REPUTATION) + age_bonus + history_bonus - penalty;
        raw.clamp(0, i64::from(MAX_REPUTATION)) as u8
    }
}

/// `max(min_limit, floor(base * reputation / 50))`.
pub fn effective_limit(base: u32, reputation: u8, min_limit: u32) -> u32 {
    let scaled = u64::from(base) * u64::from(reputation.min(MAX_REPUTATION))
        / u64::from(NEUTRAL_REPUTATION);
    u32::try_from(scaled).unwrap_or(u32::MAX).max(min_limit)
}

/// Rejections that lower a user's reputation.
pub fn counts_as_violation(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::RateLimitExceeded
            | ErrorCode::ReplayAttack
            | ErrorCode::InvalidSignature
            | ErrorCode::UnauthorizedResourceAccess
    )
}
