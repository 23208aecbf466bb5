//! Video Frame Acquisition
//!
//! Provides frame sources for the safety-analytics pipeline:
//! - HTTP snapshot cameras (ESP32-class devices serving one JPEG per request)
//! - Stub source for tests and demos
//!
//! Frame acquisition is the only stage of the pipeline allowed to block, and
//! even that is bounded by [`ReconnectPolicy`].

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, HttpSnapshotSource, ReconnectPolicy, StubFrameSource};

use thiserror::Error;

/// Frame acquisition error types
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to connect to source: {0}")]
    Connect(String),

    #[error("Frame read failed: {0}")]
    Read(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Invalid source URL: {0}")]
    Url(String),

    #[error("Stream unavailable after {0} reconnect attempts")]
    StreamUnavailable(u32),
}
