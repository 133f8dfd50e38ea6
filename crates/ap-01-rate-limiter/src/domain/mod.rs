//! # Domain Layer
//!
//! Tier limits and the reputation policy. No I/O.

pub mod config;
pub mod reputation;
