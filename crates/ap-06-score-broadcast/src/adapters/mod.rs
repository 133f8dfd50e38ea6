//! # Adapters
//!
//! `ScoreCache` over the shared key-value store. Values are JSON; an entry
//! that fails to decode is treated as a miss.
//!
//! Each entry has a sibling `<key>:gen` holding a random generation that
//! every invalidation replaces before deleting the entry. A fill writes,
//! then re-reads the generation and deletes its own write if it moved, so a
//! fill and an invalidation interleaved in any order never leave a stale
//! entry behind.

use crate::domain::{CacheConfig, FillToken, LeaderboardSnapshot};
use crate::ports::outbound::ScoreCache;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_store::KeyValueStore;
use shared_types::{RankedScore, Rejection, SharedClock, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

const LEADERBOARD_KEY: &str = "cache:leaderboard";
/// Generations outlive the entries they fence by this factor.
const GENERATION_TTL_FACTOR: u32 = 4;

pub struct KvScoreCache {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    clock: SharedClock,
}

impl KvScoreCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig, clock: SharedClock) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    fn user_key(user: &UserId) -> String {
        format!("cache:score:{user}")
    }

    fn generation_key(key: &str) -> String {
        format!("{key}:gen")
    }

    fn generation_ttl(&self) -> Duration {
        self.config.user_score_ttl.max(self.config.leaderboard_ttl) * GENERATION_TTL_FACTOR
    }

    async fn fill_token(&self, key: &str) -> Result<FillToken, Rejection> {
        let generation = self
            .store
            .get(&Self::generation_key(key), self.clock.now())
            .await?;
        Ok(FillToken::new(generation))
    }

    async fn invalidate(&self, key: &str) -> Result<(), Rejection> {
        self.store
            .set(
                &Self::generation_key(key),
                Uuid::new_v4().as_bytes().to_vec(),
                Some(self.generation_ttl()),
                self.clock.now(),
            )
            .await?;
        self.store.delete(key).await?;
        Ok(())
    }

    async fn fenced_write<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        token: &FillToken,
    ) -> Result<bool, Rejection> {
        self.write(key, value, ttl).await?;
        if self.fill_token(key).await? == *token {
            return Ok(true);
        }
        debug!(key, "Cache fill discarded after concurrent invalidation");
        self.store.delete(key).await?;
        Ok(false)
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Rejection> {
        let Some(bytes) = self.store.get(key, self.clock.now()).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Undecodable cache entry ignored");
                Ok(None)
            }
        }
    }

    async fn write<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), Rejection> {
        let bytes = serde_json::to_vec(value).map_err(|_| Rejection::internal())?;
        self.store
            .set(key, bytes, Some(ttl), self.clock.now())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ScoreCache for KvScoreCache {
    async fn user_score(&self, user: &UserId) -> Result<Option<RankedScore>, Rejection> {
        self.read(&Self::user_key(user)).await
    }

    async fn user_fill_token(&self, user: &UserId) -> Result<FillToken, Rejection> {
        self.fill_token(&Self::user_key(user)).await
    }

    async fn put_user_score(
        &self,
        entry: &RankedScore,
        token: &FillToken,
    ) -> Result<bool, Rejection> {
        self.fenced_write(
            &Self::user_key(&entry.user_id),
            entry,
            self.config.user_score_ttl,
            token,
        )
        .await
    }

    async fn invalidate_user(&self, user: &UserId) -> Result<(), Rejection> {
        self.invalidate(&Self::user_key(user)).await
    }

    async fn leaderboard(&self) -> Result<Option<LeaderboardSnapshot>, Rejection> {
        self.read(LEADERBOARD_KEY).await
    }

    async fn leaderboard_fill_token(&self) -> Result<FillToken, Rejection> {
        self.fill_token(LEADERBOARD_KEY).await
    }

    async fn put_leaderboard(
        &self,
        snapshot: &LeaderboardSnapshot,
        token: &FillToken,
    ) -> Result<bool, Rejection> {
        self.fenced_write(LEADERBOARD_KEY, snapshot, self.config.leaderboard_ttl, token)
            .await
    }

    async fn invalidate_leaderboard(&self) -> Result<(), Rejection> {
        self.invalidate(LEADERBOARD_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_store::InMemoryStore;
    use shared_types::ManualClock;

    #[tokio::test]
    async fn test_user_entry_expires() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = KvScoreCache::new(
            Arc::new(InMemoryStore::new()),
            CacheConfig::default(),
            clock.clone(),
        );
        let entry = RankedScore {
            user_id: UserId::new("alice"),
            score: 10,
            rank: 1,
        };
        let token = cache.user_fill_token(&entry.user_id).await.unwrap();
        assert!(cache.put_user_score(&entry, &token).await.unwrap());
        assert_eq!(cache.user_score(&entry.user_id).await.unwrap(), Some(entry.clone()));

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.user_score(&entry.user_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fill_with_token_from_before_invalidation_is_dropped() {
        let cache = KvScoreCache::new(
            Arc::new(InMemoryStore::new()),
            CacheConfig::default(),
            Arc::new(ManualClock::new(0)),
        );
        let alice = UserId::new("alice");
        let old = RankedScore {
            user_id: alice.clone(),
            score: 10,
            rank: 1,
        };
        let token = cache.user_fill_token(&alice).await.unwrap();
        cache.invalidate_user(&alice).await.unwrap();
        assert!(!cache.put_user_score(&old, &token).await.unwrap());
        assert_eq!(cache.user_score(&alice).await.unwrap(), None);

        // A token taken after the invalidation fills normally.
        let token = cache.user_fill_token(&alice).await.unwrap();
        assert!(cache.put_user_score(&old, &token).await.unwrap());
        assert_eq!(cache.user_score(&alice).await.unwrap(), Some(old));
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let store = Arc::new(InMemoryStore::new());
        store
            .set(LEADERBOARD_KEY, b"{not json".to_vec(), None, 0)
            .await
            .unwrap();
        let cache = KvScoreCache::new(store, CacheConfig::default(), Arc::new(ManualClock::new(0)));
        assert_eq!(cache.leaderboard().await.unwrap(), None);
    }
}
