//! # Attack Simulations
//!
//! Each module drives the full pipeline the way a hostile client would and
//! asserts the rejection code plus the absence of any ledger effect.

pub mod rate_limit;
pub mod replay;
pub mod zero_trust;
