//! Control Routes
//!
//! Operator inputs into the running pipeline. All of these take effect on the
//! next evaluated frame.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::AppState;

/// Request body for the context endpoint
#[derive(Debug, Deserialize)]
pub struct ContextRequest {
    /// Night/low-visibility context flag
    pub night: bool,
}

/// Generic acknowledgement response
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub ok: bool,
    pub message: String,
}

/// Set the night/low-visibility context flag
pub async fn set_context(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ContextRequest>,
) -> Json<AckResponse> {
    state.pipeline.set_night(request.night);
    Json(AckResponse {
        ok: true,
        message: format!("night context set to {}", request.night),
    })
}

/// Trigger the manual alarm override and an immediate SOS attempt
pub async fn trigger_manual(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    info!("Manual alert requested via API");
    state.pipeline.trigger_manual_alert();
    Json(AckResponse {
        ok: true,
        message: "manual alert armed".to_string(),
    })
}

/// Disarm the manual alarm override
pub async fn clear_manual(State(state): State<Arc<AppState>>) -> Json<AckResponse> {
    state.pipeline.clear_override();
    Json(AckResponse {
        ok: true,
        message: "manual alert cleared".to_string(),
    })
}
