//! # Action Pipeline Runtime
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (logging + metrics registry)
//! 2. Load configuration (TOML file from `AP_CONFIG`, then `AP_*` overrides)
//! 3. Validate it; an absent or short token secret aborts startup
//! 4. Build the stage container (Level 0 → Level 3)
//! 5. Start the store GC task and the HTTP server
//! 6. Run until Ctrl+C, then drain connections and stop background tasks

use action_runtime::{router, serve, AppState, PipelineConfig, PipelineContainer};
use anyhow::{Context, Result};
use ap_telemetry::{init_telemetry, TelemetryConfig};
use shared_types::SystemTimeSource;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(&TelemetryConfig::from_env())?;

    let config = PipelineConfig::from_env().context("loading configuration")?;
    let container = PipelineContainer::build(&config, Arc::new(SystemTimeSource))
        .context("building pipeline")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let gc = container.spawn_store_gc(shutdown_rx.clone());

    let app = router(AppState::from_container(&container), &config.server);
    let listener = TcpListener::bind(config.server.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.server.bind_addr))?;

    let mut server_shutdown = shutdown_rx;
    let server = tokio::spawn(serve(listener, app, async move {
        while server_shutdown.changed().await.is_ok() {
            if *server_shutdown.borrow() {
                break;
            }
        }
    }));

    info!("Action pipeline is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    let _ = shutdown_tx.send(true);
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server error"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
    }
    let _ = gc.await;
    info!("Shutdown complete");
    Ok(())
}
