//! Inbound port.

use async_trait::async_trait;
use shared_types::{ActionType, Rejection, UserId};

/// Who and what a full four-tier check is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSubject {
    /// Network source identity (client IP).
    pub source: String,
    pub user: UserId,
    pub action: ActionType,
}

/// Rate limiter API.
///
/// The pipeline runs tier 1 before authentication (only the source is known
/// then) and tiers 2-4 after it; `check` runs all four in one call.
#[async_trait]
pub trait RateLimiterApi: Send + Sync {
    /// Tier 1.
    async fn check_source(&self, source: &str) -> Result<(), Rejection>;

    /// Tiers 2, 3 and 4, in that order.
    async fn check_principal(&self, user: &UserId, action: ActionType) -> Result<(), Rejection>;

    /// All four tiers, first rejection wins.
    async fn check(&self, subject: &RateLimitSubject) -> Result<(), Rejection> {
        self.check_source(&subject.source).await?;
        self.check_principal(&subject.user, subject.action).await
    }

    /// Current (possibly cached) reputation for a user.
    async fn reputation(&self, user: &UserId) -> Result<u8, Rejection>;
}
