//! Cross-stage flows through the wired container.

pub mod concurrency;
pub mod flows;
