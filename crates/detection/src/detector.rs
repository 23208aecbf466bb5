//! Face and gender model wrappers

use crate::{Detect, DetectionConfig, DetectionError, FaceBox, GenderLabel, PersonDetection};
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};
use tracing::{debug, info, warn};
use video_ingest::VideoFrame;

/// BGR channel means of the gender network's training set
const GENDER_MEAN_BGR: [f32; 3] = [78.426_34, 87.768_914, 114.895_85];
/// Gender network input side length
const GENDER_INPUT_SIZE: u32 = 227;
/// Face SSD input side length
const FACE_INPUT_SIZE: u32 = 300;
/// Face SSD channel means (RGB order, the net was exported with swapped channels)
const FACE_MEAN_RGB: [f32; 3] = [104.0, 117.0, 123.0];

fn load_session(path: &str) -> Result<Session, DetectionError> {
    Session::builder()
        .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| DetectionError::ModelLoad(e.to_string()))
}

/// Face detector (SSD-style box regressor).
///
/// With a configured model, runs the ONNX session and decodes the standard
/// `[1,1,N,7]` SSD output rows. Without one, returns no faces so the pipeline
/// degrades to zero entities instead of failing.
pub struct FaceDetector {
    confidence_threshold: f32,
    session: Option<Session>,
}

impl FaceDetector {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionError> {
        let session = match &config.face_model_path {
            Some(path) => {
                info!("Loading face detection model from {}", path);
                Some(load_session(path)?)
            }
            None => {
                warn!("No face model path configured; detector will report no faces");
                None
            }
        };

        Ok(Self {
            confidence_threshold: config.face_confidence,
            session,
        })
    }

    /// Detect faces in frame. Degenerate frames yield an empty list.
    pub fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceBox>, DetectionError> {
        if frame.width == 0 || frame.height == 0 {
            return Ok(Vec::new());
        }
        let Some(session) = &self.session else {
            return Ok(Vec::new());
        };

        let input = preprocess_rgb(frame, FACE_INPUT_SIZE, FACE_MEAN_RGB, 1.0)?;

        let outputs = session
            .run(ort::inputs![input].map_err(|e| DetectionError::Inference(e.to_string()))?)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let detections = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let (fw, fh) = (frame.width as f32, frame.height as f32);
        let mut boxes = Vec::new();
        // Rows: [image_id, label, confidence, x1, y1, x2, y2] normalized
        for row in detections.as_slice().unwrap_or(&[]).chunks_exact(7) {
            let confidence = row[2];
            if confidence < self.confidence_threshold {
                continue;
            }
            boxes.push(FaceBox {
                x1: (row[3] * fw).clamp(0.0, fw),
                y1: (row[4] * fh).clamp(0.0, fh),
                x2: (row[5] * fw).clamp(0.0, fw),
                y2: (row[6] * fh).clamp(0.0, fh),
                confidence,
            });
        }
        debug!("Face detector produced {} boxes", boxes.len());
        Ok(boxes)
    }
}

/// Gender classifier over a padded face crop.
pub struct GenderClassifier {
    session: Option<Session>,
}

impl GenderClassifier {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionError> {
        let session = match &config.gender_model_path {
            Some(path) => {
                info!("Loading gender model from {}", path);
                Some(load_session(path)?)
            }
            None => None,
        };
        Ok(Self { session })
    }

    /// Classify a face crop. Degenerate crops fall back to a fixed low-
    /// confidence label rather than failing.
    pub fn classify(&self, face: &VideoFrame) -> Result<(GenderLabel, f32), DetectionError> {
        if face.width == 0 || face.height == 0 {
            return Ok((GenderLabel::Female, 0.0));
        }
        let Some(session) = &self.session else {
            // Mock: deterministic label so an unconfigured deployment still runs
            return Ok((GenderLabel::Female, 0.5));
        };

        // The gender net is BGR, mean-subtracted
        let input = preprocess_bgr(face, GENDER_INPUT_SIZE, GENDER_MEAN_BGR)?;

        let outputs = session
            .run(ort::inputs![input].map_err(|e| DetectionError::Inference(e.to_string()))?)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let probs = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let probs = probs.as_slice().unwrap_or(&[]);
        if probs.len() < 2 {
            return Err(DetectionError::Inference(
                "gender output shorter than 2 classes".into(),
            ));
        }

        // Class order: [Male, Female]
        if probs[1] >= probs[0] {
            Ok((GenderLabel::Female, probs[1]))
        } else {
            Ok((GenderLabel::Male, probs[0]))
        }
    }
}

/// Composite per-frame detector: face boxes + gender per padded crop.
pub struct PersonDetector {
    face: FaceDetector,
    gender: GenderClassifier,
    padding: u32,
}

impl PersonDetector {
    pub fn new(config: &DetectionConfig) -> Result<Self, DetectionError> {
        Ok(Self {
            face: FaceDetector::new(config)?,
            gender: GenderClassifier::new(config)?,
            padding: config.face_padding,
        })
    }
}

impl Detect for PersonDetector {
    fn detect_frame(&mut self, frame: &VideoFrame) -> Result<Vec<PersonDetection>, DetectionError> {
        let faces = self.face.detect(frame)?;
        let mut people = Vec::with_capacity(faces.len());
        let pad = self.padding as i64;

        for bbox in faces {
            let crop = frame.crop_clipped(
                bbox.x1 as i64 - pad,
                bbox.y1 as i64 - pad,
                bbox.x2 as i64 + pad,
                bbox.y2 as i64 + pad,
            );
            let Some(crop) = crop else {
                // Box collapsed after clipping; skip the entity this frame
                continue;
            };
            let (gender, gender_confidence) = self.gender.classify(&crop)?;
            people.push(PersonDetection {
                bbox,
                gender,
                gender_confidence,
            });
        }
        Ok(people)
    }
}

/// Resize to `size`x`size` and build a (1,3,S,S) RGB tensor, scaled by `scale`.
fn preprocess_rgb(
    frame: &VideoFrame,
    size: u32,
    mean: [f32; 3],
    scale: f32,
) -> Result<Array4<f32>, DetectionError> {
    let resized = resize_rgb(frame, size)?;
    let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - mean[c]) * scale;
        }
    }
    Ok(input)
}

/// Resize and build a (1,3,S,S) BGR tensor with per-channel mean subtraction.
fn preprocess_bgr(
    frame: &VideoFrame,
    size: u32,
    mean_bgr: [f32; 3],
) -> Result<Array4<f32>, DetectionError> {
    let resized = resize_rgb(frame, size)?;
    let mut input = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        // RGB pixel -> BGR channel order
        input[[0, 0, y as usize, x as usize]] = pixel[2] as f32 - mean_bgr[0];
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 - mean_bgr[1];
        input[[0, 2, y as usize, x as usize]] = pixel[0] as f32 - mean_bgr[2];
    }
    Ok(input)
}

fn resize_rgb(
    frame: &VideoFrame,
    size: u32,
) -> Result<image::RgbImage, DetectionError> {
    let img = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| DetectionError::ImageProcessing("frame buffer size mismatch".into()))?;
    Ok(image::imageops::resize(
        &img,
        size,
        size,
        image::imageops::FilterType::Triangle,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_detector_reports_no_faces() {
        let detector = FaceDetector::new(&DetectionConfig::default()).unwrap();
        let frame = VideoFrame::filled(320, 240, [128, 128, 128]);
        assert!(detector.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_degenerate_frame_is_empty_not_fatal() {
        let detector = FaceDetector::new(&DetectionConfig::default()).unwrap();
        let frame = VideoFrame::new(Vec::new(), 0, 0, 0, 0);
        assert!(detector.detect(&frame).unwrap().is_empty());
    }

    #[test]
    fn test_degenerate_crop_classifies_without_error() {
        let classifier = GenderClassifier::new(&DetectionConfig::default()).unwrap();
        let crop = VideoFrame::new(Vec::new(), 0, 0, 0, 0);
        let (_, confidence) = classifier.classify(&crop).unwrap();
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_face_box_centroid() {
        let bbox = FaceBox {
            x1: 100.0,
            y1: 50.0,
            x2: 200.0,
            y2: 150.0,
            confidence: 0.9,
        };
        assert_eq!(bbox.centroid(), (150.0, 100.0));
    }
}
