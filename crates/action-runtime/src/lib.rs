//! # Action Runtime
//!
//! Process-level assembly of the action pipeline.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and the stage container (dependency injection)
//! - `adapters` - Ports implemented by one stage on top of another
//! - `pipeline` - The per-request orchestrator, gate order and post-commit effects
//! - `api/` - HTTP routes and WebSocket score streams
//!
//! ## Request Flow
//!
//! ```text
//! POST /v1/actions
//!   → rate limit (source) → decode → authenticate → authorize
//!   → rate limit (user, action, adaptive) → signature + nonce
//!   → score engine → ledger commit
//!   → cache invalidation → score broadcast → 200 receipt
//! ```
//!
//! Any gate failure short-circuits into a structured rejection and a
//! fraud-audit event. Nothing after the ledger commit can turn an accepted
//! action into a rejection.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod api;
pub mod container;
pub mod pipeline;

pub use api::{router, serve, AppState};
pub use container::{ConfigError, PipelineConfig, PipelineContainer};
pub use pipeline::{ActionPipeline, PipelineStages, RequestContext};
