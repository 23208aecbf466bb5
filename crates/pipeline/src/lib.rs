//! Safety-Analytics Pipeline
//!
//! Drives the per-frame evaluation chain:
//! detector -> entity tracker -> gesture classifier -> risk evaluator ->
//! alert log -> evidence & notification dispatch.
//!
//! The chain is sequential by necessity: each stage consumes the previous
//! stage's output for the same frame. Evidence writes and notification sends
//! are the only offloaded work, and both are rate-limited upstream.

pub mod config;
pub mod runner;
pub mod state;

pub use config::{PipelineConfig, ReconnectConfig, SourceConfig, SourceKind};
pub use runner::Pipeline;
pub use state::{PipelineHandle, StatusSnapshot};

use thiserror::Error;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Frame stream unavailable: {0}")]
    Ingest(#[from] video_ingest::IngestError),

    #[error("Detector setup failed: {0}")]
    Detection(#[from] detection::DetectionError),

    #[error("Dispatcher setup failed: {0}")]
    Dispatch(#[from] dispatch::DispatchError),

    #[error("Alerting setup failed: {0}")]
    Alerting(#[from] alerting::AlertError),

    #[error("Configuration error: {0}")]
    Config(String),
}
