//! Detection configuration

use serde::{Deserialize, Serialize};

/// Detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Face detection confidence threshold
    pub face_confidence: f32,

    /// Padding around the face box when cropping for gender classification (px)
    pub face_padding: u32,

    /// Model paths; mocks are used when unset
    pub face_model_path: Option<String>,
    pub gender_model_path: Option<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            face_confidence: 0.7,
            face_padding: 30,
            face_model_path: None,
            gender_model_path: None,
        }
    }
}
