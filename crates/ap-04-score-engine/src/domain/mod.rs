//! # Domain Layer
//!
//! - `scoring`: score table and the pure scoring arithmetic
//! - `resources`: server-held resources that actions reference
//! - `strategy`: per-action validation and scoring strategies

pub mod resources;
pub mod scoring;
pub mod strategy;
