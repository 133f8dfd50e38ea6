//! # Domain Layer
//!
//! Pure request-integrity rules with no I/O.

pub mod canonical;
pub mod freshness;
