//! # Score Engine Subsystem (AP-04)
//!
//! Computes the score delta for an authenticated, signed action.
//!
//! ## Zero-Trust Rule
//!
//! The client never supplies a reward. `actionData` is parsed through a
//! per-action whitelist; any other field (`points`, `score`, `bonus`, ...) is
//! dropped before scoring. The delta is a deterministic function of:
//!
//! - the static [`ScoreTable`],
//! - server-held resource state ([`ResourceRepository`]),
//! - server-held activity history ([`ActivityRepository`]),
//! - the server clock.
//!
//! ## Precondition Order
//!
//! | Step | Check | Rejection |
//! |------|-------|-----------|
//! | 1 | referenced resource exists | `RESOURCE_NOT_FOUND` |
//! | 2 | principal may act on it | `UNAUTHORIZED_RESOURCE_ACCESS` |
//! | 3 | not completed before by this user | `ALREADY_COMPLETED` |
//! | 4 | cooldown elapsed | `COOLDOWN_ACTIVE` |
//! | 5 | score from table and server facts | - |
//!
//! ## Module Structure
//!
//! ```text
//! domain/   - ScoreTable, Task/Article, ActionStrategy + StrategyRegistry
//! ports/    - ScoreEngineApi (inbound); ResourceRepository, ActivityRepository (outbound)
//! adapters/ - in-memory repositories
//! service   - ScoreEngine
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryActivityRepository, InMemoryResourceRepository};
pub use domain::resources::{Article, Task};
pub use domain::scoring::{ScoreAward, ScoreTable, ScoringFacts};
pub use domain::strategy::{
    ActionStrategy, CompleteTaskStrategy, DailyCheckInStrategy, PublishArticleStrategy,
    ResolvedAction, StrategyRegistry,
};
pub use ports::inbound::ScoreEngineApi;
pub use ports::outbound::{ActivityRepository, ResourceRepository};
pub use service::ScoreEngine;
