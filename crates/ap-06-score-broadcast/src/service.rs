//! # Post-Commit Services

use crate::domain::{should_invalidate_leaderboard, LeaderboardSnapshot};
use crate::ports::outbound::{RankingSource, ScoreCache};
use shared_bus::{EventPublisher, PipelineEvent, ScoreUpdate};
use shared_types::{RankedScore, Rejection, Score, UserId};
use std::sync::Arc;
use tracing::{debug, trace};

// =============================================================================
// CACHE INVALIDATION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidationOutcome {
    pub leaderboard_invalidated: bool,
}

pub struct CacheInvalidator {
    cache: Arc<dyn ScoreCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<dyn ScoreCache>) -> Self {
        Self { cache }
    }

    /// Drops the user's entry, then the leaderboard only if `new_score`
    /// could change it. With no snapshot cached the leaderboard is still
    /// invalidated so that a fill already reading the source is discarded.
    pub async fn invalidate(
        &self,
        user: &UserId,
        new_score: Score,
    ) -> Result<InvalidationOutcome, Rejection> {
        self.cache.invalidate_user(user).await?;

        let leaderboard_invalidated = match self.cache.leaderboard().await? {
            Some(snapshot) if should_invalidate_leaderboard(&snapshot, user, new_score) => {
                self.cache.invalidate_leaderboard().await?;
                true
            }
            Some(_) => {
                trace!(user = %user, new_score, "Leaderboard cache unaffected");
                false
            }
            None => {
                self.cache.invalidate_leaderboard().await?;
                true
            }
        };
        debug!(user = %user, leaderboard_invalidated, "Score caches invalidated");
        Ok(InvalidationOutcome {
            leaderboard_invalidated,
        })
    }
}

// =============================================================================
// READ-THROUGH LEADERBOARD
// =============================================================================

pub struct LeaderboardService {
    cache: Arc<dyn ScoreCache>,
    source: Arc<dyn RankingSource>,
    size: usize,
}

impl LeaderboardService {
    pub fn new(cache: Arc<dyn ScoreCache>, source: Arc<dyn RankingSource>, size: usize) -> Self {
        Self {
            cache,
            source,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Top `limit` entries. Requests within the cached size are served from
    /// the snapshot; a cache failure falls back to the source.
    pub async fn top(&self, limit: usize) -> Result<Vec<RankedScore>, Rejection> {
        if limit > self.size {
            return self.source.top(limit).await;
        }
        match self.cache.leaderboard().await {
            Ok(Some(snapshot)) if snapshot.capacity >= limit => {
                return Ok(snapshot.entries.into_iter().take(limit).collect());
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Leaderboard cache read failed"),
        }

        let token = self.cache.leaderboard_fill_token().await;
        let entries = self.source.top(self.size).await?;
        let snapshot = LeaderboardSnapshot {
            capacity: self.size,
            entries,
        };
        match token {
            Ok(token) => {
                if let Err(e) = self.cache.put_leaderboard(&snapshot, &token).await {
                    debug!(error = %e, "Leaderboard cache fill failed");
                }
            }
            Err(e) => debug!(error = %e, "Leaderboard cache fill skipped"),
        }
        Ok(snapshot.entries.into_iter().take(limit).collect())
    }

    /// One user's score and rank, cached.
    pub async fn standing(&self, user: &UserId) -> Result<RankedScore, Rejection> {
        match self.cache.user_score(user).await {
            Ok(Some(entry)) => return Ok(entry),
            Ok(None) => {}
            Err(e) => debug!(error = %e, "User score cache read failed"),
        }
        let token = self.cache.user_fill_token(user).await;
        let entry = self.source.standing(user).await?;
        match token {
            Ok(token) => {
                if let Err(e) = self.cache.put_user_score(&entry, &token).await {
                    debug!(error = %e, "User score cache fill failed");
                }
            }
            Err(e) => debug!(error = %e, "User score cache fill skipped"),
        }
        Ok(entry)
    }
}

// =============================================================================
// BROADCAST
// =============================================================================

pub struct ScoreBroadcaster {
    bus: Arc<dyn EventPublisher>,
}

impl ScoreBroadcaster {
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self { bus }
    }

    /// Returns the number of bus receivers attached at send time.
    pub async fn publish(&self, update: ScoreUpdate) -> usize {
        let user = update.user_id.clone();
        let delivered = self.bus.publish(PipelineEvent::ScoreUpdated(update)).await;
        debug!(user = %user, delivered, "Score update broadcast");
        delivered
    }
}
