//! HTTP handlers.

use super::AppState;
use crate::pipeline::RequestContext;
use ap_02_auth_gate::{parse_bearer, AuthGateApi};
use ap_telemetry::encode_metrics;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use shared_types::{ErrorCode, Permission, Principal, Rejection, SessionId, UserId};
use std::net::SocketAddr;
use tracing::{debug, error, info};

/// Largest leaderboard page a client may ask for.
pub const MAX_LEADERBOARD_LIMIT: usize = 1000;
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

// =============================================================================
// ERROR RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_code: ErrorCode,
    message: String,
    /// Seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

/// A rejection rendered as `{errorCode, message, retryAfter?}`.
#[derive(Debug)]
pub struct ApiError(pub Rejection);

impl From<Rejection> for ApiError {
    fn from(rejection: Rejection) -> Self {
        Self(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let rejection = self.0;
        let status = StatusCode::from_u16(rejection.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let retry_after = rejection.retry_after_secs();
        let body = ErrorBody {
            error_code: rejection.code,
            message: rejection.message,
            retry_after,
        };
        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// `POST /v1/actions`
pub async fn submit_action(
    State(state): State<AppState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let direct = connect.map(|ConnectInfo(addr)| addr.ip());
    let source = state.proxies.client_ip(&headers, direct);
    let ctx = RequestContext::new(source.to_string());
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match state.pipeline.submit_json(&ctx, bearer, &body).await {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(rejection) => ApiError(rejection).into_response(),
    }
}

// =============================================================================
// READS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

/// `GET /v1/leaderboard?limit=`
pub async fn leaderboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let principal = authenticate(&state, &headers, None).await?;
    state.auth.authorize(&principal, Permission::ViewLeaderboard)?;

    let Query(query) = query.map_err(|e| Rejection::invalid_request(e.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    if limit == 0 || limit > MAX_LEADERBOARD_LIMIT {
        return Err(Rejection::invalid_request(format!(
            "limit must be between 1 and {MAX_LEADERBOARD_LIMIT}"
        ))
        .into());
    }
    let entries = state.leaderboard.top(limit).await?;
    Ok(Json(entries).into_response())
}

/// `GET /v1/users/:id/score`. Own score, or anyone's with `ViewAnyScore`.
pub async fn user_score(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let principal = authenticate(&state, &headers, None).await?;
    let user = UserId::new(id);
    authorize_user_view(&state, &principal, &user)?;
    let standing = state.leaderboard.standing(&user).await?;
    Ok(Json(standing).into_response())
}

pub(crate) fn authorize_user_view(
    state: &AppState,
    principal: &Principal,
    user: &UserId,
) -> Result<(), Rejection> {
    let needed = if &principal.id == user {
        Permission::ViewOwnScore
    } else {
        Permission::ViewAnyScore
    };
    state.auth.authorize(principal, needed)
}

/// Bearer from the `Authorization` header, else from `query_token`
/// (browsers cannot set headers on a WebSocket handshake).
pub(crate) fn request_token<'a>(
    headers: &'a HeaderMap,
    query_token: Option<&'a str>,
) -> Result<&'a str, Rejection> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    match (from_header, query_token) {
        (None, Some(token)) if !token.is_empty() => Ok(token),
        _ => parse_bearer(from_header),
    }
}

pub(crate) async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<Principal, Rejection> {
    let token = request_token(headers, query_token)?;
    let principal = state.auth.authenticate(token).await;
    if let Err(e) = &principal {
        debug!(code = e.code.as_str(), "Read request not authenticated");
    }
    principal
}

/// `DELETE /v1/sessions/:id`. Logout of one's own session, or any session
/// with `ManageSessions`.
pub async fn revoke_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = authenticate(&state, &headers, None).await?;
    let session = SessionId::new(id);
    if principal.session_id != session {
        state.auth.authorize(&principal, Permission::ManageSessions)?;
    }
    state.auth.revoke_session(&session).await?;
    info!(by = %principal.id, session = %session, "Session revoked");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// OPERATIONS
// =============================================================================

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    subscribers: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(Health {
        status: "ok",
        subscribers: state.bus.subscriber_count(),
    })
}

/// `GET /metrics`, Prometheus text format.
pub async fn metrics() -> Response {
    match encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
