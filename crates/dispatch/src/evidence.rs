//! Rate-limited evidence snapshot capture

use crate::DispatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use video_ingest::VideoFrame;

/// Evidence capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceConfig {
    /// Directory holding one image file per capture
    pub dir: PathBuf,
    /// Minimum interval between captures (seconds)
    pub min_interval_secs: u64,
    /// Bounded depth of the background write queue
    pub queue_depth: usize,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("evidence"),
            min_interval_secs: 3,
            queue_depth: 4,
        }
    }
}

/// One persisted capture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub timestamp: DateTime<Utc>,
    pub path: PathBuf,
}

struct EvidenceJob {
    frame: VideoFrame,
    path: PathBuf,
}

/// Rate-limited snapshot capture with a bounded background writer.
///
/// `maybe_capture` decides synchronously; the JPEG encode and file write
/// happen on a worker task. A full queue rejects the new job rather than
/// growing without bound; the rate limit upstream makes that a rare event.
pub struct EvidenceCapture {
    config: EvidenceConfig,
    min_interval: Duration,
    last_capture: Option<Instant>,
    tx: mpsc::Sender<EvidenceJob>,
}

impl EvidenceCapture {
    /// Create the capture directory and spawn the writer task.
    pub fn new(config: EvidenceConfig) -> Result<Self, DispatchError> {
        std::fs::create_dir_all(&config.dir)
            .map_err(|e| DispatchError::EvidenceDir(e.to_string()))?;

        let (tx, mut rx) = mpsc::channel::<EvidenceJob>(config.queue_depth.max(1));
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let path = job.path.clone();
                let result =
                    tokio::task::spawn_blocking(move || save_jpeg(&job.frame, &job.path)).await;
                match result {
                    Ok(Ok(())) => debug!("Evidence written: {}", path.display()),
                    Ok(Err(e)) => warn!("Evidence write failed for {}: {}", path.display(), e),
                    Err(e) => warn!("Evidence writer task failed: {}", e),
                }
            }
        });

        info!("Evidence capture ready at {}", config.dir.display());
        let min_interval = Duration::from_secs(config.min_interval_secs);
        Ok(Self {
            config,
            min_interval,
            last_capture: None,
            tx,
        })
    }

    /// Capture the frame if the rolling interval has elapsed.
    ///
    /// Returns the record for accepted captures so the caller can log it.
    /// Writes are fire-and-forget; a failed write still counts against the
    /// interval (the attempt was made).
    pub fn maybe_capture(&mut self, frame: &VideoFrame, now: Instant) -> Option<EvidenceRecord> {
        if let Some(last) = self.last_capture {
            if now.duration_since(last) < self.min_interval {
                return None;
            }
        }

        let timestamp = Utc::now();
        let filename = format!("evidence_{}.jpg", timestamp.format("%Y%m%d_%H%M%S"));
        let path = self.config.dir.join(filename);

        let job = EvidenceJob {
            frame: frame.clone(),
            path: path.clone(),
        };
        match self.tx.try_send(job) {
            Ok(()) => {
                self.last_capture = Some(now);
                Some(EvidenceRecord { timestamp, path })
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Evidence queue full; dropping capture");
                None
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Evidence writer gone; dropping capture");
                None
            }
        }
    }
}

fn save_jpeg(frame: &VideoFrame, path: &Path) -> Result<(), String> {
    let img = image::RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| "frame buffer size mismatch".to_string())?;
    img.save(path).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &Path) -> EvidenceConfig {
        EvidenceConfig {
            dir: dir.to_path_buf(),
            min_interval_secs: 3,
            queue_depth: 4,
        }
    }

    #[tokio::test]
    async fn test_at_most_one_capture_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture = EvidenceCapture::new(config(dir.path())).unwrap();
        let frame = VideoFrame::filled(32, 32, [200, 0, 0]);

        let start = Instant::now();
        let mut records = 0;
        // Dozens of CRITICAL frames inside one 3-second window
        for i in 0..60 {
            let now = start + Duration::from_millis(i * 33);
            if capture.maybe_capture(&frame, now).is_some() {
                records += 1;
            }
        }
        assert_eq!(records, 1);

        // Next window admits exactly one more
        let later = start + Duration::from_secs(3);
        assert!(capture.maybe_capture(&frame, later).is_some());
        assert!(capture
            .maybe_capture(&frame, later + Duration::from_millis(100))
            .is_none());
    }

    #[tokio::test]
    async fn test_capture_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture = EvidenceCapture::new(config(dir.path())).unwrap();
        let frame = VideoFrame::filled(32, 32, [200, 0, 0]);

        let record = capture.maybe_capture(&frame, Instant::now()).unwrap();
        // Writer is fire-and-forget; give it a moment
        for _ in 0..50 {
            if record.path.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(record.path.exists());
        assert!(record
            .path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("evidence_"));
    }

    #[tokio::test]
    async fn test_full_queue_rejects_without_stalling() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.min_interval_secs = 0;
        cfg.queue_depth = 1;
        let mut capture = EvidenceCapture::new(cfg).unwrap();
        // Large frames keep the writer busy long enough to fill the queue
        let frame = VideoFrame::filled(1280, 720, [200, 0, 0]);

        let start = Instant::now();
        let mut accepted = 0;
        for i in 0..20 {
            if capture
                .maybe_capture(&frame, start + Duration::from_millis(i))
                .is_some()
            {
                accepted += 1;
            }
        }
        // Some captures are dropped, none block
        assert!(accepted >= 1);
        assert!(accepted <= 20);
    }
}
