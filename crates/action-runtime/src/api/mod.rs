//! # HTTP / WebSocket Surface
//!
//! | Route | Method | Handler |
//! |-------|--------|---------|
//! | `/v1/actions` | POST | full pipeline |
//! | `/v1/leaderboard?limit=` | GET | top-N read |
//! | `/v1/users/:id/score` | GET | single standing |
//! | `/v1/sessions/:id` | DELETE | session revocation |
//! | `/v1/ws/leaderboard` | GET (upgrade) | global score stream |
//! | `/v1/ws/users/:id` | GET (upgrade) | per-user score stream |
//! | `/health` | GET | liveness |
//! | `/metrics` | GET | Prometheus text |

pub mod client_ip;
pub mod handlers;
pub mod ws;

pub use client_ip::TrustedProxies;
pub use handlers::{ApiError, MAX_LEADERBOARD_LIMIT};

use crate::container::{PipelineContainer, ServerConfig};
use crate::pipeline::ActionPipeline;
use ap_02_auth_gate::AuthGate;
use ap_06_score_broadcast::LeaderboardService;
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use shared_bus::InMemoryEventBus;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Handles shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ActionPipeline>,
    pub auth: Arc<AuthGate>,
    pub leaderboard: Arc<LeaderboardService>,
    pub bus: Arc<InMemoryEventBus>,
    pub proxies: Arc<TrustedProxies>,
    /// Credential re-validation period for open score streams.
    pub session_recheck: Duration,
}

impl AppState {
    pub fn from_container(container: &PipelineContainer) -> Self {
        let server = &container.config.server;
        Self {
            pipeline: container.pipeline.clone(),
            auth: container.auth.clone(),
            leaderboard: container.leaderboard.clone(),
            bus: container.bus.clone(),
            proxies: Arc::new(TrustedProxies::new(
                server.trusted_proxies.clone(),
                server.trust_localhost,
            )),
            session_recheck: server.session_recheck,
        }
    }
}

/// Builds the router with tracing, CORS, body limit and request timeout.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .map_response(IntoResponse::into_response)
        .layer(RequestBodyLimitLayer::new(config.body_limit))
        .layer(TimeoutLayer::new(config.request_timeout));

    Router::new()
        .route("/v1/actions", post(handlers::submit_action))
        .route("/v1/leaderboard", get(handlers::leaderboard))
        .route("/v1/users/:id/score", get(handlers::user_score))
        .route("/v1/sessions/:id", delete(handlers::revoke_session))
        .route("/v1/ws/leaderboard", get(ws::leaderboard_updates))
        .route("/v1/ws/users/:id", get(ws::user_updates))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(middleware)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

/// Serves `router` on `listener` until `shutdown` resolves. Peer addresses
/// are attached for the per-source rate limit.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
