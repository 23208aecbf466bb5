//! Detection Capability Boundary
//!
//! Face detection and per-face gender classification. The neural networks are
//! external capabilities: when model paths are configured we run ONNX sessions
//! through `ort`, otherwise deterministic mocks keep the pipeline runnable.
//!
//! Degenerate inputs (empty frames, zero-area crops) always yield empty
//! results, never errors; the pipeline treats them as zero entities.

pub mod config;
pub mod detector;

pub use config::DetectionConfig;
pub use detector::{FaceDetector, GenderClassifier, PersonDetector};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use video_ingest::VideoFrame;

/// Detection error types
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}

/// Classified gender label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenderLabel {
    Male,
    Female,
}

impl GenderLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenderLabel::Male => "Male",
            GenderLabel::Female => "Female",
        }
    }
}

/// Face bounding box in frame coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

impl FaceBox {
    /// Geometric center, the entity's position proxy
    pub fn centroid(&self) -> (f32, f32) {
        ((self.x1 + self.x2) * 0.5, (self.y1 + self.y2) * 0.5)
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }
}

/// One classified person detection, produced fresh every frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonDetection {
    pub bbox: FaceBox,
    pub gender: GenderLabel,
    pub gender_confidence: f32,
}

/// Per-frame detection contract consumed by the pipeline.
///
/// Implemented by [`PersonDetector`] in production and by scripted stubs in
/// pipeline tests.
pub trait Detect: Send {
    fn detect_frame(&mut self, frame: &VideoFrame) -> Result<Vec<PersonDetection>, DetectionError>;
}
