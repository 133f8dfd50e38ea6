//! Per-call timeout wrapper.
//!
//! Every external store call carries an explicit deadline. A timeout is a
//! transient failure, never a rejection of the action itself.

use crate::store::{KeyValueStore, StoreError, WindowDecision};
use async_trait::async_trait;
use shared_types::Timestamp;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Wraps any [`KeyValueStore`] and bounds each call with `timeout`.
#[derive(Debug)]
pub struct TimedStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: KeyValueStore> TimedStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for TimedStore<S> {
    async fn record_hit(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
        now: Timestamp,
    ) -> Result<WindowDecision, StoreError> {
        self.bounded("record_hit", self.inner.record_hit(key, window, limit, now))
            .await
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        self.bounded("put_if_absent", self.inner.put_if_absent(key, value, ttl, now))
            .await
    }

    async fn exists(&self, key: &str, now: Timestamp) -> Result<bool, StoreError> {
        self.bounded("exists", self.inner.exists(key, now)).await
    }

    async fn get(&self, key: &str, now: Timestamp) -> Result<Option<Vec<u8>>, StoreError> {
        self.bounded("get", self.inner.get(key, now)).await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        self.bounded("set", self.inner.set(key, value, ttl, now)).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.bounded("delete", self.inner.delete(key)).await
    }
}
