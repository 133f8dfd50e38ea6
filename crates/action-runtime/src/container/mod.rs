//! Configuration and dependency wiring.

pub mod config;
pub mod subsystems;

pub use config::{
    AuthSettings, ConfigError, PipelineConfig, ServerConfig, StoreConfig, MIN_TOKEN_SECRET_LEN,
};
pub use subsystems::PipelineContainer;
