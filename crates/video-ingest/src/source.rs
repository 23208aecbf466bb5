//! Frame sources and reconnect policy

use crate::frame::VideoFrame;
use crate::IngestError;
use std::io::Read;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};
use url::Url;

/// Upper bound on a single JPEG snapshot
const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

/// A source of decoded RGB frames.
///
/// `next_frame` may block while waiting for the camera; every other pipeline
/// stage is non-blocking. Sources report health so the caller can decide when
/// to reconnect.
pub trait FrameSource: Send {
    /// (Re-)establish the connection to the camera.
    fn connect(&mut self) -> Result<(), IngestError>;

    /// Capture the next frame.
    fn next_frame(&mut self) -> Result<VideoFrame, IngestError>;

    /// Whether the source produced a frame recently.
    fn is_healthy(&self) -> bool;

    /// Human-readable source description for logs.
    fn describe(&self) -> String;
}

/// Bounded retry/reconnect policy for frame acquisition.
///
/// A failed read triggers up to `max_retries` reconnect attempts with linear
/// backoff. Exhausting the budget surfaces `StreamUnavailable` instead of
/// looping forever.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Reconnect attempts before giving up
    pub max_retries: u32,
    /// Backoff base between attempts
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: Duration::from_millis(500),
        }
    }
}

impl ReconnectPolicy {
    /// Acquire one frame, reconnecting on failure within the retry budget.
    pub fn acquire(&self, source: &mut dyn FrameSource) -> Result<VideoFrame, IngestError> {
        match source.next_frame() {
            Ok(frame) => return Ok(frame),
            Err(e) => warn!("Frame read failed from {}: {}", source.describe(), e),
        }

        for attempt in 1..=self.max_retries {
            std::thread::sleep(self.backoff * attempt);
            debug!(
                "Reconnect attempt {}/{} to {}",
                attempt,
                self.max_retries,
                source.describe()
            );
            if let Err(e) = source.connect() {
                warn!("Reconnect failed: {}", e);
                continue;
            }
            match source.next_frame() {
                Ok(frame) => {
                    info!("Source {} recovered after {} attempts", source.describe(), attempt);
                    return Ok(frame);
                }
                Err(e) => warn!("Frame read failed after reconnect: {}", e),
            }
        }

        Err(IngestError::StreamUnavailable(self.max_retries))
    }
}

/// HTTP snapshot camera source.
///
/// Fetches one JPEG per request from a snapshot endpoint (ESP32-class cameras
/// and most IP cameras expose one) and decodes it to RGB.
pub struct HttpSnapshotSource {
    url: String,
    sequence: u64,
    last_ok: bool,
}

impl HttpSnapshotSource {
    pub fn new(url: &str) -> Result<Self, IngestError> {
        let parsed = Url::parse(url).map_err(|e| IngestError::Url(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(IngestError::Url(format!(
                    "unsupported scheme '{other}'; expected http(s)"
                )))
            }
        }
        Ok(Self {
            url: url.to_string(),
            sequence: 0,
            last_ok: false,
        })
    }

    fn fetch(&mut self) -> Result<VideoFrame, IngestError> {
        let response = ureq::get(&self.url)
            .call()
            .map_err(|e| IngestError::Read(e.to_string()))?;

        let mut jpeg = Vec::new();
        response
            .into_reader()
            .take(MAX_JPEG_BYTES as u64)
            .read_to_end(&mut jpeg)
            .map_err(|e| IngestError::Read(e.to_string()))?;

        let decoded =
            image::load_from_memory(&jpeg).map_err(|e| IngestError::Decode(e.to_string()))?;
        let rgb = decoded.to_rgb8();
        let (width, height) = (rgb.width(), rgb.height());

        self.sequence += 1;
        Ok(VideoFrame::new(
            rgb.into_raw(),
            width,
            height,
            now_ns(),
            self.sequence,
        ))
    }
}

impl FrameSource for HttpSnapshotSource {
    fn connect(&mut self) -> Result<(), IngestError> {
        // Snapshot endpoints are stateless; probe with a HEAD-equivalent GET.
        ureq::get(&self.url)
            .call()
            .map_err(|e| IngestError::Connect(e.to_string()))?;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<VideoFrame, IngestError> {
        let frame = self.fetch();
        self.last_ok = frame.is_ok();
        frame
    }

    fn is_healthy(&self) -> bool {
        self.last_ok
    }

    fn describe(&self) -> String {
        format!("http-snapshot({})", self.url)
    }
}

/// Synthetic frame source for tests and demos.
///
/// Emits uniformly colored frames, optionally failing a scripted number of
/// reads first to exercise reconnect handling.
pub struct StubFrameSource {
    width: u32,
    height: u32,
    sequence: u64,
    /// Reads that fail before the source starts producing frames
    pub fail_reads: u32,
    /// Whether `connect` succeeds
    pub connect_ok: bool,
}

impl StubFrameSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            sequence: 0,
            fail_reads: 0,
            connect_ok: true,
        }
    }
}

impl FrameSource for StubFrameSource {
    fn connect(&mut self) -> Result<(), IngestError> {
        if self.connect_ok {
            Ok(())
        } else {
            Err(IngestError::Connect("stub connect refused".into()))
        }
    }

    fn next_frame(&mut self) -> Result<VideoFrame, IngestError> {
        if self.fail_reads > 0 {
            self.fail_reads -= 1;
            return Err(IngestError::Read("stub read failure".into()));
        }
        self.sequence += 1;
        let mut frame = VideoFrame::filled(self.width, self.height, [16, 16, 16]);
        frame.timestamp_ns = now_ns();
        frame.sequence = self.sequence;
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        self.fail_reads == 0
    }

    fn describe(&self) -> String {
        format!("stub({}x{})", self.width, self.height)
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
