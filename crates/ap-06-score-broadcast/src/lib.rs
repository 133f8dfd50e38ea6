//! # Score Broadcast Subsystem (AP-06)
//!
//! Everything that happens after a commit succeeds.
//!
//! - **CacheInvalidator**: drops the user's cached score and, only when the
//!   new score could change it, the cached top-N leaderboard.
//! - **LeaderboardService**: read-through cache over a `RankingSource`.
//! - **ScoreBroadcaster**: publishes `ScoreUpdated` on the leaderboard and
//!   per-user topics.
//!
//! The ledger is the source of truth. Failures here are reported to the
//! caller for logging and never undo or reject a committed action.
//! Delivery is best-effort and at-least-once per live subscriber.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::KvScoreCache;
pub use domain::{should_invalidate_leaderboard, CacheConfig, FillToken, LeaderboardSnapshot};
pub use ports::outbound::{RankingSource, ScoreCache};
pub use service::{CacheInvalidator, InvalidationOutcome, LeaderboardService, ScoreBroadcaster};
