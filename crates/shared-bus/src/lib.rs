//! # Shared Bus - Score Event Fan-Out
//!
//! Publish/subscribe channel that carries committed score changes to any
//! number of real-time listeners, plus the fraud-audit feed of rejections.
//!
//! ## Topics
//!
//! ```text
//! ┌──────────────┐   publish()   ┌──────────────┐   subscribe()  ┌──────────────┐
//! │ Broadcaster  │ ────────────▶ │  Event Bus   │ ─────────────▶ │ Leaderboard  │
//! │ (post-commit)│               │              │ ─────────────▶ │ User(id)     │
//! └──────────────┘               └──────────────┘ ─────────────▶ │ FraudAudit   │
//!                                                                 └──────────────┘
//! ```
//!
//! ## Delivery
//!
//! Best-effort. The ledger is the source of truth; an event is only a
//! notification. Slow subscribers skip lagged events instead of blocking
//! publishers.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, PipelineEvent, RejectionNotice, ScoreUpdate};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
