//! In-memory store on `dashmap`.
//!
//! Per-key shard locks give every operation single-operation consistency.
//! No lock is held across an await point.

use crate::store::{KeyValueStore, StoreError, WindowDecision};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::{duration_ms, Timestamp};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct WindowLog {
    hits: VecDeque<Timestamp>,
    window_ms: u64,
}

impl WindowLog {
    fn purge(&mut self, now: Timestamp) {
        let cutoff = now.saturating_sub(self.window_ms);
        while self.hits.front().is_some_and(|&t| t <= cutoff) {
            self.hits.pop_front();
        }
    }
}

#[derive(Debug, Clone)]
struct ValueEntry {
    bytes: Vec<u8>,
    expires_at: Option<Timestamp>,
}

impl ValueEntry {
    fn new(bytes: Vec<u8>, ttl: Option<Duration>, now: Timestamp) -> Self {
        Self {
            bytes,
            expires_at: ttl.map(|ttl| now.saturating_add(duration_ms(ttl))),
        }
    }

    fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-process implementation of [`KeyValueStore`].
#[derive(Debug)]
pub struct InMemoryStore {
    windows: DashMap<String, WindowLog>,
    values: DashMap<String, ValueEntry>,
    available: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
            values: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Simulates an outage: every call fails with [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Drops expired values and windows with no live hits.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let before = self.len();
        self.values.retain(|_, entry| entry.is_live(now));
        self.windows.retain(|_, log| {
            log.purge(now);
            !log.hits.is_empty()
        });
        let removed = before.saturating_sub(self.len());
        if removed > 0 {
            debug!(removed, "Purged expired store entries");
        }
        removed
    }

    /// Number of stored keys, live or not yet purged.
    pub fn len(&self) -> usize {
        self.values.len() + self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn record_hit(
        &self,
        key: &str,
        window: Duration,
        limit: u32,
        now: Timestamp,
    ) -> Result<WindowDecision, StoreError> {
        self.ensure_available()?;
        let window_ms = duration_ms(window);

        // The entry guard holds the shard lock for purge + count + append.
        let mut log = self
            .windows
            .entry(key.to_owned())
            .or_insert_with(|| WindowLog {
                hits: VecDeque::new(),
                window_ms,
            });
        log.window_ms = window_ms;
        log.purge(now);

        let count = u32::try_from(log.hits.len()).unwrap_or(u32::MAX);
        if count < limit {
            log.hits.push_back(now);
            return Ok(WindowDecision {
                allowed: true,
                count: count + 1,
                retry_after: None,
            });
        }

        let retry_after_ms = log
            .hits
            .front()
            .map(|&oldest| oldest.saturating_add(window_ms).saturating_sub(now))
            .unwrap_or(window_ms)
            .max(1);
        Ok(WindowDecision {
            allowed: false,
            count,
            retry_after: Some(Duration::from_millis(retry_after_ms)),
        })
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        now: Timestamp,
    ) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let fresh = ValueEntry::new(value, Some(ttl), now);
        match self.values.entry(key.to_owned()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    Ok(false)
                } else {
                    occupied.insert(fresh);
                    Ok(true)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                Ok(true)
            }
        }
    }

    async fn exists(&self, key: &str, now: Timestamp) -> Result<bool, StoreError> {
        self.ensure_available()?;
        Ok(self
            .values
            .get(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn get(&self, key: &str, now: Timestamp) -> Result<Option<Vec<u8>>, StoreError> {
        self.ensure_available()?;
        Ok(self
            .values
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.bytes.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        self.ensure_available()?;
        self.values
            .insert(key.to_owned(), ValueEntry::new(value, ttl, now));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.ensure_available()?;
        Ok(self.values.remove(key).is_some())
    }
}
