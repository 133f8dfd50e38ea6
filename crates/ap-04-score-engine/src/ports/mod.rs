//! # Ports Layer
//!
//! - `inbound`: `ScoreEngineApi`
//! - `outbound`: `ResourceRepository`, `ActivityRepository`

pub mod inbound;
pub mod outbound;
