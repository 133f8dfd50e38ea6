//! # Adapters
//!
//! `NonceStore` backed by the shared key-value store.

use crate::ports::outbound::NonceStore;
use async_trait::async_trait;
use shared_store::KeyValueStore;
use shared_types::{Rejection, Timestamp};
use std::sync::Arc;
use std::time::Duration;

/// Nonce records live under `nonce:{nonce}` with the first-seen time as value.
pub struct KvNonceStore {
    store: Arc<dyn KeyValueStore>,
}

impl KvNonceStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(nonce: &str) -> String {
        format!("nonce:{nonce}")
    }
}

#[async_trait]
impl NonceStore for KvNonceStore {
    async fn seen(&self, nonce: &str, now: Timestamp) -> Result<bool, Rejection> {
        Ok(self.store.exists(&Self::key(nonce), now).await?)
    }

    async fn record(&self, nonce: &str, ttl: Duration, now: Timestamp) -> Result<bool, Rejection> {
        let seen_at = now.to_be_bytes().to_vec();
        Ok(self
            .store
            .put_if_absent(&Self::key(nonce), seen_at, ttl, now)
            .await?)
    }
}
