//! # Action Pipeline Telemetry
//!
//! Structured logging and Prometheus metrics for every pipeline stage.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ap_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(&TelemetryConfig::from_env()).expect("telemetry");
//!     // Guard is dropped on exit, flushing buffered log lines
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AP_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `AP_JSON_LOGS` | `false` | Emit JSON lines instead of pretty output |
//! | `AP_SERVICE_NAME` | `action-pipeline` | Service name stamped on the startup log |

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, HistogramTimer, MetricsHandle, ACTIONS_ACCEPTED,
    ACTIONS_RECEIVED, EVENTS_PUBLISHED, POINTS_AWARDED, POST_COMMIT_FAILURES, REJECTIONS,
    STAGE_DURATION, TRANSIENT_FAILURES,
};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Guard that keeps telemetry active. Drop to flush buffered log lines.
pub struct TelemetryGuard {
    _log_writer: WorkerGuard,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}

/// Initialize metrics and logging.
///
/// Returns a guard that must be held for the lifetime of the application.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    let log_writer = init_logging(config)?;
    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );
    Ok(TelemetryGuard {
        _log_writer: log_writer,
        _metrics: metrics,
    })
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Start timing a pipeline stage. Observation happens on drop.
#[macro_export]
macro_rules! time_stage {
    ($stage:expr) => {
        $crate::metrics::HistogramTimer::new(
            &$crate::metrics::STAGE_DURATION.with_label_values(&[$stage]),
        )
    };
}
