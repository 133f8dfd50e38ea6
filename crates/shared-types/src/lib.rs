//! # Shared Types Crate
//!
//! Domain entities, the rejection taxonomy, and the cross-cutting helpers
//! (time source, retry policy, HMAC primitives) used by every stage of the
//! action pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-stage types are defined here.
//! - **Stable Error Codes**: Every gate failure maps to one `ErrorCode` whose
//!   wire name never changes.
//! - **Injected Time**: No stage reads the wall clock directly; all of them
//!   take a `TimeSource` so windows can be driven deterministically in tests.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod entities;
pub mod errors;
pub mod retry;
pub mod security;
pub mod time;

pub use entities::*;
pub use errors::*;
pub use retry::{retry_transient, RetryPolicy};
pub use security::{sign_hex, verify_hex, HmacSha256, SigningKey};
pub use time::{duration_ms, ManualClock, SharedClock, SystemTimeSource, TimeSource};
