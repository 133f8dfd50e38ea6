//! WebSocket score streams.
//!
//! `/v1/ws/leaderboard` carries every committed score change and
//! `/v1/ws/users/:id` only that user's. Frames are `ScoreUpdate` JSON; the
//! streams are server-to-client only and incoming text is ignored.
//!
//! The credential a stream was opened with is re-validated every
//! `server.session_recheck`; once it is revoked or expired the stream is
//! closed with a policy-violation frame.

use super::handlers::{authorize_user_view, request_token, ApiError};
use super::AppState;
use ap_02_auth_gate::{AuthGate, AuthGateApi};
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use shared_bus::{EventFilter, EventStream, PipelineEvent};
use shared_types::{Permission, Principal, Rejection, UserId};
use std::borrow::Cow;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub access_token: Option<String>,
}

/// Periodic re-authentication of an open stream.
pub struct SessionWatch {
    auth: Arc<AuthGate>,
    token: String,
    every: Duration,
}

impl SessionWatch {
    pub fn new(auth: Arc<AuthGate>, token: String, every: Duration) -> Self {
        Self { auth, token, every }
    }

    /// A transient store failure keeps the stream open until the next check.
    async fn check(&self) -> Result<(), Rejection> {
        match self.auth.authenticate(&self.token).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_transient() => {
                debug!(code = e.code.as_str(), "Stream credential check deferred");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

async fn open_stream(
    state: &AppState,
    headers: &HeaderMap,
    query: &StreamQuery,
    permit: impl FnOnce(&Principal) -> Result<(), Rejection>,
) -> Result<SessionWatch, Rejection> {
    let token = request_token(headers, query.access_token.as_deref())?;
    let principal = state.auth.authenticate(token).await?;
    permit(&principal)?;
    Ok(SessionWatch::new(
        state.auth.clone(),
        token.to_string(),
        state.session_recheck,
    ))
}

/// `GET /v1/ws/leaderboard`
pub async fn leaderboard_updates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let opened = open_stream(&state, &headers, &query, |principal| {
        state.auth.authorize(principal, Permission::ViewLeaderboard)
    })
    .await;
    let watch = match opened {
        Ok(watch) => watch,
        Err(rejection) => return ApiError(rejection).into_response(),
    };
    // Subscribe before the upgrade so nothing committed during the handshake
    // is missed.
    let events = state.bus.event_stream(EventFilter::leaderboard());
    ws.on_upgrade(move |socket| {
        let (sink, incoming) = socket.split();
        forward_updates(sink, incoming, events, watch, "leaderboard".to_string())
    })
}

/// `GET /v1/ws/users/:id`
pub async fn user_updates(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<StreamQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let user = UserId::new(id);
    let opened = open_stream(&state, &headers, &query, |principal| {
        authorize_user_view(&state, principal, &user)
    })
    .await;
    let watch = match opened {
        Ok(watch) => watch,
        Err(rejection) => return ApiError(rejection).into_response(),
    };
    let events = state.bus.event_stream(EventFilter::user(user.clone()));
    ws.on_upgrade(move |socket| {
        let (sink, incoming) = socket.split();
        forward_updates(sink, incoming, events, watch, format!("user:{user}"))
    })
}

async fn forward_updates<Si, St, E>(
    mut sink: Si,
    mut incoming: St,
    mut events: EventStream,
    watch: SessionWatch,
    topic: String,
) where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
    St: Stream<Item = Result<Message, E>> + Unpin,
{
    info!(topic = %topic, "Score stream opened");
    let mut recheck = interval_at(Instant::now() + watch.every, watch.every);
    recheck.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            event = events.next() => {
                let update = match event {
                    Some(PipelineEvent::ScoreUpdated(update)) => update,
                    Some(_) => continue,
                    None => break,
                };
                let frame = match serde_json::to_string(&update) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Failed to encode score update");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    debug!(topic = %topic, error = %e, "Score stream send failed");
                    break;
                }
            }
            message = incoming.next() => match message {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            },
            _ = recheck.tick() => {
                if let Err(rejection) = watch.check().await {
                    info!(
                        topic = %topic,
                        code = rejection.code.as_str(),
                        "Closing score stream, credential no longer valid"
                    );
                    let close = CloseFrame {
                        code: close_code::POLICY,
                        reason: Cow::Borrowed(rejection.code.as_str()),
                    };
                    if let Err(e) = sink.send(Message::Close(Some(close))).await {
                        debug!(topic = %topic, error = %e, "Score stream close failed");
                    }
                    break;
                }
            }
        }
    }
    info!(topic = %topic, "Score stream closed");
}
