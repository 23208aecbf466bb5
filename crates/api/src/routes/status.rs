//! Status & Event Routes

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use alerting::{AlertEvent, RECENT_CAPACITY};
use pipeline::StatusSnapshot;

/// Response for the status endpoint: the frame-loop snapshot plus the
/// recent-events buffer, copied out so readers never hold pipeline locks.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
    pub recent_events: Vec<AlertEvent>,
}

/// Current pipeline status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let snapshot = state.pipeline.status().await;
    let recent_events = state.pipeline.events(RECENT_CAPACITY);
    Json(StatusResponse {
        snapshot,
        recent_events,
    })
}

/// Query parameters for the events endpoint
#[derive(Debug, Deserialize)]
pub struct EventQuery {
    /// Maximum number of events, newest first
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

/// Response for the events endpoint
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub data: Vec<AlertEvent>,
    pub count: usize,
}

/// Recent alert events
pub async fn get_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventQuery>,
) -> Json<EventResponse> {
    let data = state.pipeline.events(params.limit);
    Json(EventResponse {
        count: data.len(),
        data,
    })
}
