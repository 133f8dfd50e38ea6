//! # Signature Verification Subsystem (AP-03)
//!
//! Request-integrity gate. Proves that an action was produced by the holder
//! of the session signing key, recently, and exactly once.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): Canonical message, freshness and nonce rules
//! - **Ports Layer** (`ports/`): `SignatureVerifierApi` (inbound), `NonceStore` (outbound)
//! - **Adapters** (`adapters/`): `KvNonceStore` over the shared store
//! - **Service Layer** (`service.rs`): `SignatureVerifier`
//!
//! ## Gates, in order
//!
//! | Step | Check | Rejection |
//! |------|-------|-----------|
//! | 1 | `now - 60s <= timestamp <= now + 5s` | `STALE_REQUEST` |
//! | 2 | nonce well-formed and not yet seen | `INVALID_SIGNATURE` / `REPLAY_ATTACK` |
//! | 3 | HMAC over `payload|nonce|timestamp|userId`, constant-time compare | `INVALID_SIGNATURE` |
//! | 4 | atomic set-if-absent of the nonce | `REPLAY_ATTACK` |
//!
//! Step 4 closes the window between two identical requests that both pass
//! step 2 concurrently: only one of them can insert the nonce.
//!
//! ## Security Notes
//!
//! - The signing key is scoped to one session, so a leaked key dies with it.
//! - A replay of an already-recorded nonce is reported as `REPLAY_ATTACK`
//!   even when its timestamp has also gone stale.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::KvNonceStore;
pub use domain::canonical::{canonical_json, canonical_message, canonical_payload, sign_request};
pub use domain::freshness::{check_freshness, validate_nonce, SignatureConfig};
pub use ports::inbound::SignatureVerifierApi;
pub use ports::outbound::NonceStore;
pub use service::SignatureVerifier;
