//! Request and response types for all plw-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use plw_runtime::{TrackingStarted, TrackingStatus};
use plw_schemas::{DiffEvent, Subscription};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Errors (400 / 404 / 503)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// "invalid_reference" | "not_found" | "unavailable" | "store"
    pub kind: String,
}

// ---------------------------------------------------------------------------
// /v1/subscriptions
// ---------------------------------------------------------------------------

/// Body of `PUT /v1/subscriptions/:platform/:chat_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTrackingRequest {
    /// Playlist URL, URI or bare id.
    pub playlist: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTrackingResponse {
    pub platform: String,
    pub chat_id: i64,
    pub started: TrackingStarted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingStatusResponse {
    pub platform: String,
    pub chat_id: i64,
    pub status: TrackingStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopTrackingResponse {
    pub platform: String,
    pub chat_id: i64,
    /// false when nothing was being tracked.
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub platform: String,
    pub chat_id: i64,
    /// false when the subscriber tracks nothing; `events` is then empty.
    pub tracking: bool,
    pub events: Vec<DiffEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionsResponse {
    pub subscriptions: Vec<Subscription>,
}
