//! # Domain Layer
//!
//! Credential encoding and parsing. No I/O.

pub mod bearer;
pub mod token;
