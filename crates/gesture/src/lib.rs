//! Help-Signal Gesture Classifier
//!
//! Looks for a raised hand/arm in a region directly above and around a face
//! box: skin-tone threshold in HSV, one erode + one dilate pass to kill
//! noise, then external contour analysis. A contour counts as gesture
//! evidence when it is large enough and taller than it is wide.
//!
//! Single-frame positives are cheap skin-tone noise, so a gesture only
//! becomes *confirmed* after persisting across consecutive frames
//! ([`GestureMemory`]).

use detection::FaceBox;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use video_ingest::VideoFrame;

/// Gesture classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    /// ROI margin above the face box (px)
    pub roi_above: i64,
    /// ROI margin left/right of the face box (px)
    pub roi_lateral: i64,
    /// ROI margin below the face box (px)
    pub roi_below: i64,
    /// Minimum qualifying contour area (px^2)
    pub min_contour_area: f64,
    /// Maximum qualifying bounding-box aspect ratio (width / height)
    pub max_aspect_ratio: f32,
    /// Consecutive frames required before a gesture is confirmed
    pub confirm_frames: u32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            roi_above: 250,
            roi_lateral: 30,
            roi_below: 50,
            min_contour_area: 3000.0,
            max_aspect_ratio: 1.5,
            confirm_frames: 10,
        }
    }
}

/// Per-entity gesture state for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureState {
    /// Gesture visually present this frame
    pub present: bool,
    /// Consecutive frames the gesture has been present
    pub consecutive: u32,
    /// Counter exceeded the persistence threshold
    pub confirmed: bool,
}

/// Help-signal gesture classifier
pub struct GestureClassifier {
    config: GestureConfig,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    /// Whether a help-signal gesture is visually present around `face`.
    ///
    /// A degenerate ROI (clipped away entirely, or zero area) classifies as
    /// absent; this is never an error.
    pub fn detect(&self, frame: &VideoFrame, face: &FaceBox) -> bool {
        let roi = frame.crop_clipped(
            face.x1 as i64 - self.config.roi_lateral,
            face.y1 as i64 - self.config.roi_above,
            face.x2 as i64 + self.config.roi_lateral,
            face.y2 as i64 + self.config.roi_below,
        );
        let Some(roi) = roi else {
            return false;
        };

        let mask = skin_mask(&roi);
        // 5x5-equivalent structuring, two iterations each way
        let mask = erode(&mask, Norm::LInf, 2);
        let mask = dilate(&mask, Norm::LInf, 2);

        for contour in find_contours::<i32>(&mask) {
            if contour.border_type != BorderType::Outer {
                continue;
            }
            let area = contour_area(&contour.points);
            if area <= self.config.min_contour_area {
                continue;
            }
            let (w, h) = contour_extent(&contour.points);
            if h == 0 {
                continue;
            }
            let aspect = w as f32 / h as f32;
            if aspect < self.config.max_aspect_ratio {
                debug!(
                    "Gesture evidence: contour area {:.0}, aspect {:.2}",
                    area, aspect
                );
                return true;
            }
        }
        false
    }
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

/// Consecutive-frame persistence counters, keyed by track id.
///
/// The counter resets to zero on any frame where the gesture is absent, and
/// entries for expired tracks are dropped via [`GestureMemory::retain_tracks`].
pub struct GestureMemory {
    counters: HashMap<u32, u32>,
    confirm_frames: u32,
}

impl GestureMemory {
    pub fn new(confirm_frames: u32) -> Self {
        Self {
            counters: HashMap::new(),
            confirm_frames,
        }
    }

    /// Record this frame's observation for a track and return its state.
    pub fn observe(&mut self, track_id: u32, present: bool) -> GestureState {
        let counter = self.counters.entry(track_id).or_insert(0);
        if present {
            *counter += 1;
        } else {
            *counter = 0;
        }
        GestureState {
            present,
            consecutive: *counter,
            confirmed: *counter > self.confirm_frames,
        }
    }

    /// Drop counters for tracks no longer alive.
    pub fn retain_tracks(&mut self, live_ids: &[u32]) {
        self.counters.retain(|id, _| live_ids.contains(id));
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

/// Binary skin-tone mask of an RGB frame.
///
/// Thresholds in HSV: hue within the warm band (<= 40 degrees), saturation
/// and value high enough to exclude shadows and washed-out background.
fn skin_mask(roi: &VideoFrame) -> GrayImage {
    let mut mask = GrayImage::new(roi.width, roi.height);
    for y in 0..roi.height {
        for x in 0..roi.width {
            if let Some([r, g, b]) = roi.get_pixel(x, y) {
                let (h, s, v) = rgb_to_hsv(r, g, b);
                let skin = h <= 40.0 && s >= 40.0 && v >= 80.0;
                mask.put_pixel(x, y, image::Luma([if skin { 255 } else { 0 }]));
            }
        }
    }
    mask
}

/// RGB -> (hue degrees 0..360, saturation 0..255, value 0..255)
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        let h = 60.0 * (((g - b) / delta) % 6.0);
        if h < 0.0 {
            h + 360.0
        } else {
            h
        }
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let s = if max == 0.0 { 0.0 } else { delta / max * 255.0 };
    (h, s, max)
}

/// Shoelace area over a closed contour boundary
fn contour_area(points: &[imageproc::point::Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area: i64 = 0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    (twice_area.abs() as f64) / 2.0
}

/// Bounding-box extent (width, height) of a contour
fn contour_extent(points: &[imageproc::point::Point<i32>]) -> (i32, i32) {
    let mut min_x = i32::MAX;
    let mut max_x = i32::MIN;
    let mut min_y = i32::MAX;
    let mut max_y = i32::MIN;
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    if min_x > max_x {
        (0, 0)
    } else {
        (max_x - min_x + 1, max_y - min_y + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIN: [u8; 3] = [200, 120, 90];
    const DARK: [u8; 3] = [16, 16, 16];

    fn face() -> FaceBox {
        FaceBox {
            x1: 170.0,
            y1: 300.0,
            x2: 230.0,
            y2: 360.0,
            confidence: 0.9,
        }
    }

    fn frame_with_blob(x0: u32, y0: u32, w: u32, h: u32) -> VideoFrame {
        let mut frame = VideoFrame::filled(400, 400, DARK);
        for y in y0..(y0 + h) {
            for x in x0..(x0 + w) {
                frame.put_pixel(x, y, SKIN);
            }
        }
        frame
    }

    #[test]
    fn test_skin_pixel_thresholds() {
        let (h, s, v) = rgb_to_hsv(SKIN[0], SKIN[1], SKIN[2]);
        assert!(h <= 40.0 && s >= 40.0 && v >= 80.0);
        let (_, _, v) = rgb_to_hsv(DARK[0], DARK[1], DARK[2]);
        assert!(v < 80.0);
    }

    #[test]
    fn test_raised_arm_blob_detected() {
        // Tall skin region above the face: 60x120, well past the area floor
        let frame = frame_with_blob(175, 80, 60, 120);
        let classifier = GestureClassifier::default();
        assert!(classifier.detect(&frame, &face()));
    }

    #[test]
    fn test_empty_roi_is_absent() {
        let frame = VideoFrame::filled(400, 400, DARK);
        let classifier = GestureClassifier::default();
        assert!(!classifier.detect(&frame, &face()));
    }

    #[test]
    fn test_wide_blob_rejected_by_aspect() {
        // 110x70 region: big enough, but wider than tall (aspect > 1.5)
        let frame = frame_with_blob(145, 120, 110, 70);
        let classifier = GestureClassifier::default();
        assert!(!classifier.detect(&frame, &face()));
    }

    #[test]
    fn test_small_blob_rejected_by_area() {
        // 20x40 = 800 px^2, below the 3000 floor
        let frame = frame_with_blob(190, 120, 20, 40);
        let classifier = GestureClassifier::default();
        assert!(!classifier.detect(&frame, &face()));
    }

    #[test]
    fn test_degenerate_roi_is_absent() {
        let frame = VideoFrame::filled(400, 400, DARK);
        let offscreen = FaceBox {
            x1: -500.0,
            y1: -500.0,
            x2: -400.0,
            y2: -400.0,
            confidence: 0.9,
        };
        let classifier = GestureClassifier::default();
        assert!(!classifier.detect(&frame, &offscreen));
    }

    #[test]
    fn test_memory_confirms_on_eleventh_frame() {
        let mut memory = GestureMemory::new(10);
        for i in 1..=10 {
            let state = memory.observe(7, true);
            assert_eq!(state.consecutive, i);
            assert!(!state.confirmed, "frame {i} must not confirm yet");
        }
        let state = memory.observe(7, true);
        assert_eq!(state.consecutive, 11);
        assert!(state.confirmed);
    }

    #[test]
    fn test_memory_gap_resets_counter() {
        let mut memory = GestureMemory::new(10);
        for _ in 0..9 {
            memory.observe(3, true);
        }
        let state = memory.observe(3, false);
        assert_eq!(state.consecutive, 0);
        // Counting starts over after the gap
        for i in 1..=10 {
            assert_eq!(memory.observe(3, true).consecutive, i);
        }
        assert!(!memory.observe(3, false).confirmed);
    }

    #[test]
    fn test_memory_retain_drops_dead_tracks() {
        let mut memory = GestureMemory::new(10);
        memory.observe(1, true);
        memory.observe(2, true);
        memory.retain_tracks(&[2]);
        assert_eq!(memory.len(), 1);
        // Track 1 starts from scratch if it ever reappears
        assert_eq!(memory.observe(1, true).consecutive, 1);
    }
}
