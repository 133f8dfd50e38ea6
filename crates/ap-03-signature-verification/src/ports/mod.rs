//! # Ports Layer
//!
//! - `inbound`: what the pipeline calls (`SignatureVerifierApi`)
//! - `outbound`: what the verifier needs (`NonceStore`)

pub mod inbound;
pub mod outbound;
