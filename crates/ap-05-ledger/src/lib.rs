//! # Transactional Ledger Subsystem (AP-05)
//!
//! Persists score deltas. One commit is a single atomic unit:
//!
//! ```text
//! lock user row ─→ re-check uniqueness/cooldown ─→ scoreAfter = scoreBefore + delta
//!       ─→ append ScoreTransaction ─→ update UserScoreState ─→ unlock
//! ```
//!
//! Any failure before the final step discards the staged changes, so score
//! and history never diverge.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | `scoreAfter = scoreBefore + delta` | `InMemoryLedgerStore::apply` (checked add) |
//! | `scoreBefore[k+1] = scoreAfter[k]` per user | row lock serializes commits |
//! | history replays to `currentScore` | `domain::chain::verify_chain` |
//! | a completion key is awarded once | re-checked under the row lock |
//!
//! Commits for the same user serialize; different users never contend.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryLedgerStore;
pub use domain::chain::{replay_score, verify_chain};
pub use domain::commit::{CommitRequest, LedgerConfig};
pub use domain::errors::{ChainViolation, LedgerError};
pub use ports::inbound::LedgerApi;
pub use ports::outbound::LedgerStore;
pub use service::TransactionalLedger;
