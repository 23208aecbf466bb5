//! Safety-Analytics API Server
//!
//! REST surface over the running pipeline: status/health/events reads plus
//! the two control inputs (night context, manual alarm). Control endpoints
//! sit behind a strict per-IP rate limit.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod rate_limit;
mod routes;

pub use rate_limit::{create_governor_config, RateLimitConfig};

use pipeline::PipelineHandle;

/// Application state shared across handlers
pub struct AppState {
    /// Control/status handle into the running pipeline
    pub pipeline: Arc<PipelineHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<PipelineHandle>) -> Self {
        Self {
            pipeline,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub frames_processed: u64,
}

/// Create the application router.
///
/// `rate_limit` guards the control endpoints; it requires the server to be
/// driven with `into_make_service_with_connect_info` for peer-IP extraction,
/// so in-process tests pass `None`.
pub fn create_router(state: Arc<AppState>, rate_limit: Option<&RateLimitConfig>) -> Router {
    let mut control = Router::new()
        .route("/api/v1/context", post(routes::control::set_context))
        .route("/api/v1/alerts/manual", post(routes::control::trigger_manual))
        .route("/api/v1/alerts/clear", post(routes::control::clear_manual));
    if let Some(config) = rate_limit {
        control = control.layer(GovernorLayer {
            config: create_governor_config(config),
        });
    }

    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/events", get(routes::status::get_events))
        .merge(control)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.pipeline.status().await;
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        frames_processed: snapshot.frames,
    })
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server until the listener fails.
pub async fn run_server(
    addr: &str,
    pipeline: Arc<PipelineHandle>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let state = Arc::new(AppState::new(pipeline));
    let app = create_router(state, Some(&RateLimitConfig::strict()));

    info!("Starting API server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{AlertLog, MemoryAuditSink};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use dispatch::{MockNotifier, NotificationDispatcher};
    use http_body_util::BodyExt;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    fn test_handle() -> Arc<PipelineHandle> {
        let alerts = Arc::new(Mutex::new(AlertLog::new(
            "Sector 4 Entrance",
            Box::new(MemoryAuditSink::default()),
        )));
        let dispatcher = NotificationDispatcher::new(
            Arc::new(MockNotifier::default()),
            Arc::clone(&alerts),
            Duration::from_secs(60),
        );
        Arc::new(PipelineHandle::new(
            alerts,
            dispatcher,
            Duration::from_secs(10),
            "Sector 4 Entrance",
            true,
        ))
    }

    fn router(handle: Arc<PipelineHandle>) -> Router {
        create_router(Arc::new(AppState::new(handle)), None)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_version_and_frames() {
        let app = router(test_handle());
        let response = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["frames_processed"], 0);
    }

    #[tokio::test]
    async fn test_status_reflects_snapshot() {
        let handle = test_handle();
        let app = router(Arc::clone(&handle));
        let response = app
            .oneshot(Request::get("/api/v1/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["level"], "Safe");
        assert_eq!(json["night"], true);
    }

    #[tokio::test]
    async fn test_context_flips_night_flag() {
        let handle = test_handle();
        let app = router(Arc::clone(&handle));
        let response = app
            .oneshot(
                Request::post("/api/v1/context")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"night": false}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!handle.night());
    }

    #[tokio::test]
    async fn test_manual_alert_arms_override() {
        let handle = test_handle();
        let app = router(Arc::clone(&handle));
        let response = app
            .oneshot(
                Request::post("/api/v1/alerts/manual")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(handle.override_active(Instant::now()));
    }

    #[tokio::test]
    async fn test_clear_disarms_override() {
        let handle = test_handle();
        handle.trigger_manual_alert();
        let app = router(Arc::clone(&handle));
        let response = app
            .oneshot(
                Request::post("/api/v1/alerts/clear")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!handle.override_active(Instant::now()));
    }

    #[tokio::test]
    async fn test_events_returns_recent_newest_first() {
        let handle = test_handle();
        handle.trigger_manual_alert();
        let app = router(Arc::clone(&handle));
        let response = app
            .oneshot(
                Request::get("/api/v1/events?limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["count"].as_u64().unwrap() >= 1);
        let events = json["data"].as_array().unwrap();
        let armed = events
            .iter()
            .find(|e| e["message"] == "Manual override active")
            .expect("override event recorded");
        assert_eq!(armed["location"], "Sector 4 Entrance");
    }
}
