//! Video frame type and pixel helpers

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Create a uniformly colored frame (stub sources, tests)
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgb);
        }
        Self::new(data, width, height, 0, 0)
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Set pixel at (x, y); out-of-bounds writes are ignored
    pub fn put_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    /// Crop a region of the frame. Returns `None` when the region exceeds
    /// the frame bounds or has zero area.
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h * 3) as usize);
        for row in y..(y + h) {
            let start = ((row * self.width + x) * 3) as usize;
            let end = start + (w * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Crop with signed, possibly out-of-bounds coordinates, clipped to the
    /// frame. Returns `None` when the clipped region is degenerate.
    pub fn crop_clipped(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> Option<VideoFrame> {
        let x1 = x1.clamp(0, self.width as i64) as u32;
        let y1 = y1.clamp(0, self.height as i64) as u32;
        let x2 = x2.clamp(0, self.width as i64) as u32;
        let y2 = y2.clamp(0, self.height as i64) as u32;
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        self.crop(x1, y1, x2 - x1, y2 - y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_roundtrip() {
        let mut frame = VideoFrame::filled(8, 8, [0, 0, 0]);
        frame.put_pixel(3, 4, [10, 20, 30]);
        assert_eq!(frame.get_pixel(3, 4), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(8, 0), None);
    }

    #[test]
    fn test_crop_bounds() {
        let frame = VideoFrame::filled(16, 16, [1, 2, 3]);
        let crop = frame.crop(4, 4, 8, 8).unwrap();
        assert_eq!(crop.width, 8);
        assert_eq!(crop.height, 8);
        assert!(frame.crop(10, 10, 8, 8).is_none());
        assert!(frame.crop(0, 0, 0, 4).is_none());
    }

    #[test]
    fn test_crop_clipped_degenerate() {
        let frame = VideoFrame::filled(16, 16, [0, 0, 0]);
        // Fully outside the frame
        assert!(frame.crop_clipped(-50, -50, -10, -10).is_none());
        // Negative origin clips to the frame edge
        let crop = frame.crop_clipped(-4, -4, 8, 8).unwrap();
        assert_eq!(crop.width, 8);
        assert_eq!(crop.height, 8);
    }
}
