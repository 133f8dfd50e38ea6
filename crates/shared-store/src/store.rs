//! Store port and its error type.

use async_trait::async_trait;
use shared_types::{Rejection, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Outcome of one sliding-window hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    pub allowed: bool,
    /// Hits inside the window after this call.
    pub count: u32,
    /// Time until the oldest hit leaves the window. Set only when rejected.
    pub retry_after: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable")]
    Unavailable,

    #[error("store operation {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}

impl From<StoreError> for Rejection {
    fn from(_: StoreError) -> Self {
        // Store internals never leak into user-visible messages.
        Rejection::store_unavailable()
    }
}

/// Atomic key-value store with TTLs and sliding-window counters.
///
/// `now` is supplied by the caller so every window is evaluated against the
/// pipeline's injected clock.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Sliding-window log hit: purge entries older than `window`, count the
    /// rest, and record `now` only if the count is below `limit`.
    async fn record_hit(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
        now: Timestamp,
    ) -> Result<WindowDecision, StoreError>;

    /// Atomically stores `value` unless a live entry exists. Returns whether
    /// this call inserted it.
    async fn put_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str, now: Timestamp) -> Result<bool, StoreError>;

    async fn get(&self, key: &str, now: Timestamp) -> Result<Option<Vec<u8>>, StoreError>;

    /// Unconditional write. `ttl = None` never expires.
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        now: Timestamp,
    ) -> Result<(), StoreError>;

    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Shared handles delegate, so one backing store can sit behind several
/// wrappers.
#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn record_hit(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
        now: Timestamp,
    ) -> Result<WindowDecision, StoreError> {
        (**self).record_hit(key, window, limit, now).await
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        (**self).put_if_absent(key, value, ttl, now).await
    }

    async fn exists(&self, key: &str, now: Timestamp) -> Result<bool, StoreError> {
        (**self).exists(key, now).await
    }

    async fn get(&self, key: &str, now: Timestamp) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key, now).await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        (**self).set(key, value, ttl, now).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        (**self).delete(key).await
    }
}
