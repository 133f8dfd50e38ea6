//! # Domain Layer
//!
//! Cache settings and the leaderboard invalidation rule.

use serde::{Deserialize, Serialize};
use shared_types::{RankedScore, Score, UserId};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Size of the cached top-N leaderboard.
    pub leaderboard_size: usize,
    #[serde(with = "humantime_serde")]
    pub leaderboard_ttl: Duration,
    #[serde(with = "humantime_serde")]
    pub user_score_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            leaderboard_size: 100,
            leaderboard_ttl: Duration::from_secs(30),
            user_score_ttl: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.leaderboard_size == 0 {
            return Err("broadcast.leaderboard_size must be > 0".to_string());
        }
        Ok(())
    }
}

/// Cached top-N leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    /// Configured N at the time the snapshot was built.
    pub capacity: usize,
    /// Best first.
    pub entries: Vec<RankedScore>,
}

impl LeaderboardSnapshot {
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.entries.iter().any(|entry| &entry.user_id == user)
    }

    /// Score of the last listed entry.
    pub fn cutoff(&self) -> Option<Score> {
        self.entries.last().map(|entry| entry.score)
    }
}

/// Invalidation generation of one cache entry, read before a read-through
/// fill. A fill is kept only if the generation is unchanged after the write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillToken(Option<Vec<u8>>);

impl FillToken {
    pub fn new(generation: Option<Vec<u8>>) -> Self {
        Self(generation)
    }
}

/// A new score can only change the top-N if the snapshot has room, the
/// user is already listed, or the score reaches the current Nth place.
pub fn should_invalidate_leaderboard(
    snapshot: &LeaderboardSnapshot,
    user: &UserId,
    new_score: Score,
) -> bool {
    if !snapshot.is_full() || snapshot.contains(user) {
        return true;
    }
    snapshot.cutoff().map_or(true, |cutoff| new_score >= cutoff)
}
