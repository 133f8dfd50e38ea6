//! Prometheus metrics for the action pipeline.
//!
//! All metrics follow the naming convention: `ap_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec,
    IntCounter, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PIPELINE THROUGHPUT
    // =========================================================================

    /// Actions that entered the pipeline
    pub static ref ACTIONS_RECEIVED: IntCounter = IntCounter::new(
        "ap_pipeline_actions_received_total",
        "Total actions submitted to the pipeline"
    ).expect("metric creation failed");

    /// Actions that cleared every gate and were committed
    pub static ref ACTIONS_ACCEPTED: CounterVec = CounterVec::new(
        Opts::new("ap_pipeline_actions_accepted_total", "Committed actions by type"),
        &["action_type"]
    ).expect("metric creation failed");

    /// Rejections by gate and code, the fraud-analysis headline metric
    pub static ref REJECTIONS: CounterVec = CounterVec::new(
        Opts::new("ap_pipeline_rejections_total", "Rejected actions by gate and error code"),
        &["gate", "code"]
    ).expect("metric creation failed");

    /// Points awarded
    pub static ref POINTS_AWARDED: Counter = Counter::new(
        "ap_ledger_points_awarded_total",
        "Total score points committed to the ledger"
    ).expect("metric creation failed");

    // =========================================================================
    // RELIABILITY
    // =========================================================================

    /// Transient failures still failing after the bounded retry
    pub static ref TRANSIENT_FAILURES: CounterVec = CounterVec::new(
        Opts::new(
            "ap_pipeline_transient_failures_total",
            "Requests failed by a transient store condition, by gate"
        ),
        &["gate"]
    ).expect("metric creation failed");

    /// Cache or broadcast failures after a successful commit
    pub static ref POST_COMMIT_FAILURES: CounterVec = CounterVec::new(
        Opts::new("ap_post_commit_failures_total", "Post-commit side effects that failed"),
        &["step"]
    ).expect("metric creation failed");

    /// Events handed to the bus
    pub static ref EVENTS_PUBLISHED: CounterVec = CounterVec::new(
        Opts::new("ap_bus_events_published_total", "Events published by kind"),
        &["kind"]
    ).expect("metric creation failed");

    // =========================================================================
    // LATENCY
    // =========================================================================

    /// Per-stage latency
    pub static ref STAGE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ap_pipeline_stage_duration_seconds",
            "Time spent in each pipeline stage"
        ).buckets(exponential_buckets(0.0001, 2.0, 14).expect("valid buckets")),
        &["stage"]
    ).expect("metric creation failed");
}

/// Handle for the metrics registry
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACTIONS_RECEIVED.clone()),
        Box::new(ACTIONS_ACCEPTED.clone()),
        Box::new(REJECTIONS.clone()),
        Box::new(POINTS_AWARDED.clone()),
        Box::new(TRANSIENT_FAILURES.clone()),
        Box::new(POST_COMMIT_FAILURES.clone()),
        Box::new(EVENTS_PUBLISHED.clone()),
        Box::new(STAGE_DURATION.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}
