//! # Rate Limiter Subsystem (AP-01)
//!
//! First gate of the action pipeline. Four tiers, evaluated in order, first
//! rejection wins:
//!
//! | Tier | Key | Purpose |
//! |------|-----|---------|
//! | 1. Global | `rl:global:{source}` | Coarse per-source ceiling, protects infrastructure |
//! | 2. Per-user | `rl:user:{user}` | Fairness between authenticated users |
//! | 3. Per-action | `rl:action:{ACTION}:{user}` | Business policy and cooldowns |
//! | 4. Adaptive | `rl:adaptive:{user}` | Base limit scaled by reputation / 50 |
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Tier configuration and the reputation policy
//! - **Ports Layer** (`ports/`): `RateLimiterApi` (inbound), `ReputationSource` and `ReputationRecorder` (outbound)
//! - **Adapters** (`adapters/`): In-memory reputation source
//! - **Service Layer** (`service.rs`): Sliding-window checks over `KeyValueStore`
//!
//! ## Algorithm
//!
//! Sliding-window log. Each check is one atomic `record_hit` on the shared
//! store (purge, count, conditional append), so two concurrent requests can
//! never both take the last slot. Hits consumed by a request that a later
//! gate rejects stay counted, so retries cannot bypass a limit.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryReputationSource;
pub use domain::config::{AdaptiveConfig, RateLimitConfig, TierLimit};
pub use domain::reputation::{
    counts_as_violation, effective_limit, DefaultReputationPolicy, ReputationInputs,
    ReputationPolicy, NEUTRAL_REPUTATION,
};
pub use ports::inbound::{RateLimitSubject, RateLimiterApi};
pub use ports::outbound::{ReputationRecorder, ReputationSource};
pub use service::RateLimiter;
