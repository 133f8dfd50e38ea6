//! # Domain Layer

pub mod chain;
pub mod commit;
pub mod errors;
