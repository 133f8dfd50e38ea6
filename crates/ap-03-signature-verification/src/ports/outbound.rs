//! Outbound port.

use async_trait::async_trait;
use shared_types::{Rejection, Timestamp};
use std::time::Duration;

/// Recently-seen nonces.
#[async_trait]
pub trait NonceStore: Send + Sync {
    async fn seen(&self, nonce: &str, now: Timestamp) -> Result<bool, Rejection>;

    /// Atomic set-if-absent. `Ok(false)` means another request recorded the
    /// nonce first.
    async fn record(&self, nonce: &str, ttl: Duration, now: Timestamp) -> Result<bool, Rejection>;
}
