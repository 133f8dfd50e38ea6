//! # Shared Store
//!
//! The fast shared store the pipeline's high-contention state lives in:
//! rate-limit windows, nonce records, the revocation set, and score caches.
//!
//! ## Consistency
//!
//! Each trait method is a single atomic operation. `record_hit` purges,
//! counts, and conditionally appends under one per-key lock, and
//! `put_if_absent` is set-if-not-exists, so no caller ever needs a separate
//! read-then-write round trip.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌───────────────┐
//! │ RateLimiter  │    │ NonceStore   │    │ ScoreCache    │
//! └──────┬───────┘    └──────┬───────┘    └──────┬────────┘
//!        │                   │                   │
//!        ▼                   ▼                   ▼
//!   ┌─────────────────────────────────────────────────┐
//!   │ TimedStore (per-call timeout → STORE_UNAVAILABLE)│
//!   └───────────────────────┬─────────────────────────┘
//!                           ▼
//!                 ┌───────────────────┐
//!                 │ InMemoryStore     │
//!                 └───────────────────┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod memory;
pub mod store;
pub mod timed;

pub use memory::InMemoryStore;
pub use store::{KeyValueStore, StoreError, WindowDecision};
pub use timed::TimedStore;
