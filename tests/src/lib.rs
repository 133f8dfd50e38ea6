//! # Action Pipeline Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Container-backed harness shared by every suite
//! │
//! ├── exploits/         # Attack simulations against the full pipeline
//! │   ├── replay.rs     # Nonce reuse, stale timestamps, tampering
//! │   ├── rate_limit.rs # Tier boundaries and source rotation
//! │   └── zero_trust.rs # Client-asserted points are never trusted
//! │
//! └── integration/      # Cross-stage flows
//!     ├── flows.rs      # Accept path, ledger consistency, broadcast
//!     └── concurrency.rs# Parallel submissions against one row
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p ap-tests
//!
//! # By category
//! cargo test -p ap-tests integration::
//! cargo test -p ap-tests exploits::
//!
//! # Benchmarks
//! cargo bench -p ap-tests
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod exploits;
pub mod integration;
pub mod support;
