//! Axum router and all HTTP handlers for plw-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Subscription handlers drive the same engine the
//! scheduler and chat commands use.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use plw_runtime::TrackerError;
use plw_schemas::SubscriberKey;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::{
    api_types::{
        CheckResponse, ErrorResponse, HealthResponse, SetTrackingRequest, SetTrackingResponse,
        StopTrackingResponse, SubscriptionsResponse, TrackingStatusResponse,
    },
    state::{AppState, BusMsg},
};

/// Body served on `/` for uptime monitors.
pub const ALIVE_BODY: &str = "Bot is running!";

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // GET also answers HEAD.
        .route("/", get(alive).post(alive).options(alive_options))
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/subscriptions", get(list_subscriptions))
        .route(
            "/v1/subscriptions/:platform/:chat_id",
            get(get_subscription)
                .put(put_subscription)
                .delete(delete_subscription),
        )
        .route(
            "/v1/subscriptions/:platform/:chat_id/check",
            post(check_subscription),
        )
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

fn error_response(e: TrackerError) -> Response {
    let (status, kind) = match &e {
        TrackerError::InvalidReference(_) => (StatusCode::BAD_REQUEST, "invalid_reference"),
        TrackerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        TrackerError::Transient(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        TrackerError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "store"),
    };
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            kind: kind.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET|HEAD|POST|OPTIONS /
// ---------------------------------------------------------------------------

pub(crate) async fn alive() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        ALIVE_BODY,
    )
}

pub(crate) async fn alive_options() -> impl IntoResponse {
    (StatusCode::OK, [(header::ALLOW, "GET, HEAD, POST, OPTIONS")])
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = st.status_snapshot().await;
    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// /v1/subscriptions
// ---------------------------------------------------------------------------

pub(crate) async fn list_subscriptions(State(st): State<Arc<AppState>>) -> Response {
    match st.engine.list_subscriptions().await {
        Ok(subscriptions) => {
            (StatusCode::OK, Json(SubscriptionsResponse { subscriptions })).into_response()
        }
        Err(e) => error_response(e),
    }
}

pub(crate) async fn get_subscription(
    State(st): State<Arc<AppState>>,
    Path((platform, chat_id)): Path<(String, i64)>,
) -> Response {
    let key = SubscriberKey::new(platform.clone(), chat_id);
    match st.engine.get_status(&key).await {
        Ok(status) => (
            StatusCode::OK,
            Json(TrackingStatusResponse {
                platform,
                chat_id,
                status,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

pub(crate) async fn put_subscription(
    State(st): State<Arc<AppState>>,
    Path((platform, chat_id)): Path<(String, i64)>,
    Json(req): Json<SetTrackingRequest>,
) -> Response {
    let key = SubscriberKey::new(platform.clone(), chat_id);
    match st.engine.set_tracking(&key, &req.playlist).await {
        Ok(started) => {
            info!(subscriber = %key, playlist_id = %started.playlist.playlist_id, "subscriptions/put");
            let _ = st.bus.send(BusMsg::LogLine {
                level: "INFO".to_string(),
                msg: format!(
                    "{key} now tracks {} ({} tracks)",
                    started.playlist.playlist_id, started.baseline_size
                ),
            });
            (
                StatusCode::OK,
                Json(SetTrackingResponse {
                    platform,
                    chat_id,
                    started,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub(crate) async fn delete_subscription(
    State(st): State<Arc<AppState>>,
    Path((platform, chat_id)): Path<(String, i64)>,
) -> Response {
    let key = SubscriberKey::new(platform.clone(), chat_id);
    match st.engine.stop_tracking(&key).await {
        Ok(removed) => {
            info!(subscriber = %key, removed, "subscriptions/delete");
            (
                StatusCode::OK,
                Json(StopTrackingResponse {
                    platform,
                    chat_id,
                    removed,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

pub(crate) async fn check_subscription(
    State(st): State<Arc<AppState>>,
    Path((platform, chat_id)): Path<(String, i64)>,
) -> Response {
    let key = SubscriberKey::new(platform.clone(), chat_id);
    match st.engine.check_now(&key).await {
        Ok(result) => {
            let tracking = result.is_some();
            let events = result.unwrap_or_default();
            (
                StatusCode::OK,
                Json(CheckResponse {
                    platform,
                    chat_id,
                    tracking,
                    events,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Status(_) => "status",
                    BusMsg::LogLine { .. } => "log",
                    BusMsg::Cycle(_) => "cycle",
                    BusMsg::Diff { .. } => "diff",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
