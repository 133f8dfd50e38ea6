//! # Ports Layer
//!
//! - **Inbound (Driving)**: `RateLimiterApi`, called by the pipeline
//! - **Outbound (Driven)**: `ReputationSource`, facts for the adaptive tier

pub mod inbound;
pub mod outbound;
