//! Bounded retry for transient store failures.
//!
//! Only `STORE_UNAVAILABLE` and `CONCURRENT_MODIFICATION` are retried. Every
//! other rejection is returned on the first attempt.

use crate::errors::Rejection;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
    pub multiplier: u32,
    /// Spread each delay randomly over `[backoff / 2, backoff]` so writers
    /// that collided on one row do not retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(200),
            multiplier: 2,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// The delay actually slept before retry number `retry`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let backoff = self.backoff_for(retry);
        if !self.jitter || backoff.is_zero() {
            return backoff;
        }
        let half = backoff / 2;
        let spread = rand::thread_rng().gen_range(0..=half.as_micros() as u64);
        half + Duration::from_micros(spread)
    }
}

/// Runs `op`, retrying transient rejections with exponential backoff.
///
/// The last rejection is surfaced unchanged once attempts are exhausted.
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, Rejection>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Rejection>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(rejection) if rejection.is_transient() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    operation,
                    attempt,
                    code = rejection.code.as_str(),
                    delay_ms = delay.as_millis() as u64,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(rejection) => return Err(rejection),
        }
    }
}
