//! # Ports Layer
//!
//! - **Inbound (Driving)**: `AuthGateApi`
//! - **Outbound (Driven)**: `SessionDirectory`, `RevocationList`

pub mod inbound;
pub mod outbound;
