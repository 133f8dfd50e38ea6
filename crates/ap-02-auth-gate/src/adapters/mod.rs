//! # Adapters
//!
//! - `InMemorySessionDirectory`: sessions registered by the identity provider
//! - `KvRevocationList`: revocation set in the shared store, self-expiring

use crate::ports::outbound::{RevocationList, SessionDirectory, SessionRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use shared_store::KeyValueStore;
use shared_types::{Rejection, SessionId, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default)]
pub struct InMemorySessionDirectory {
    sessions: DashMap<SessionId, SessionRecord>,
}

impl InMemorySessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_session(&self, session_id: SessionId, record: SessionRecord) {
        self.sessions.insert(session_id, record);
    }

    /// Returns whether the session existed.
    pub fn close_session(&self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionDirectory for InMemorySessionDirectory {
    async fn session(&self, session_id: &SessionId) -> Result<Option<SessionRecord>, Rejection> {
        Ok(self.sessions.get(session_id).map(|record| record.clone()))
    }
}

/// Revocation set stored as `revoked:{session}` keys.
pub struct KvRevocationList {
    store: Arc<dyn KeyValueStore>,
}

impl KvRevocationList {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(session_id: &SessionId) -> String {
        format!("revoked:{session_id}")
    }
}

#[async_trait]
impl RevocationList for KvRevocationList {
    async fn is_revoked(&self, session_id: &SessionId, now: Timestamp) -> Result<bool, Rejection> {
        Ok(self.store.exists(&Self::key(session_id), now).await?)
    }

    async fn revoke(
        &self,
        session_id: &SessionId,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<(), Rejection> {
        self.store
            .set(&Self::key(session_id), Vec::new(), Some(ttl), now)
            .await?;
        info!(session = %session_id, ttl_secs = ttl.as_secs(), "Session revoked");
        Ok(())
    }
}
