//! Frame evaluation loop

use crate::config::PipelineConfig;
use crate::state::{PipelineHandle, StatusSnapshot};
use crate::PipelineError;
use alerting::{AlertLevel, AlertLog, CsvAuditSink};
use chrono::Utc;
use detection::{Detect, GenderLabel, PersonDetector};
use dispatch::{EvidenceCapture, NotificationDispatcher, Notifier};
use gesture::{GestureClassifier, GestureMemory};
use risk::{EntitySignal, RiskEngine, RiskLevel};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracker::EntityTracker;
use tracing::{info, warn};
use video_ingest::{FrameSource, ReconnectPolicy, VideoFrame};

/// The per-frame evaluation pipeline.
///
/// Owns every stage and drives them in order for each frame:
/// detect -> track -> gesture -> evaluate -> alert/evidence/notify -> publish.
/// Stage failures inside a frame degrade that frame (zero detections); only a
/// dead frame stream ends the loop.
pub struct Pipeline {
    detector: Box<dyn Detect>,
    tracker: EntityTracker,
    gestures: GestureClassifier,
    gesture_memory: GestureMemory,
    engine: RiskEngine,
    evidence: EvidenceCapture,
    reconnect: ReconnectPolicy,
    handle: Arc<PipelineHandle>,
    frames: u64,
}

impl Pipeline {
    /// Build the pipeline from configuration with the production detector.
    ///
    /// Must be called inside a tokio runtime (the evidence writer spawns).
    pub fn new(
        config: &PipelineConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, PipelineError> {
        let detector = Box::new(PersonDetector::new(&config.detection)?);
        Self::with_detector(config, detector, notifier)
    }

    /// Build the pipeline around an injected detector.
    pub fn with_detector(
        config: &PipelineConfig,
        detector: Box<dyn Detect>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, PipelineError> {
        let sink = CsvAuditSink::new(&config.audit_log)?;
        let alerts = Arc::new(Mutex::new(AlertLog::new(&config.location, Box::new(sink))));
        let dispatcher = NotificationDispatcher::new(
            notifier,
            Arc::clone(&alerts),
            Duration::from_secs(config.notifier.throttle_secs),
        );
        let handle = Arc::new(PipelineHandle::new(
            alerts,
            dispatcher,
            Duration::from_secs(config.override_secs),
            &config.location,
            config.night,
        ));

        Ok(Self {
            detector,
            tracker: EntityTracker::new(config.tracker.clone()),
            gestures: GestureClassifier::new(config.gesture.clone()),
            gesture_memory: GestureMemory::new(config.gesture.confirm_frames),
            engine: RiskEngine::new(config.risk.clone()),
            evidence: EvidenceCapture::new(config.evidence.clone())?,
            reconnect: ReconnectPolicy {
                max_retries: config.reconnect.max_retries,
                backoff: Duration::from_millis(config.reconnect.backoff_ms),
            },
            handle,
            frames: 0,
        })
    }

    /// Shared control/status handle.
    pub fn handle(&self) -> Arc<PipelineHandle> {
        Arc::clone(&self.handle)
    }

    /// Evaluate a single frame end to end.
    pub async fn process_frame(&mut self, frame: &VideoFrame) {
        let now = Instant::now();
        self.frames += 1;

        let detections = match self.detector.detect_frame(frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Detection failed for frame {}: {}", frame.sequence, e);
                Vec::new()
            }
        };

        self.tracker.update(&detections);

        // Gesture analysis runs on women's tracks only; a coasting track has
        // no fresh pixels, which counts as an absent observation and resets
        // its persistence counter.
        let mut signals: Vec<EntitySignal> = Vec::new();
        let mut live_ids: Vec<u32> = Vec::new();
        let tracks: Vec<tracker::Track> = self.tracker.tracks().to_vec();
        for track in &tracks {
            live_ids.push(track.id);
            let mut confirmed = false;
            if track.gender == GenderLabel::Female {
                let present = track.seen_this_frame() && self.gestures.detect(frame, &track.bbox);
                confirmed = self.gesture_memory.observe(track.id, present).confirmed;
            }
            if track.seen_this_frame() {
                signals.push(EntitySignal {
                    gender: track.gender,
                    centroid: track.centroid,
                    speed: track.speed,
                    gesture_confirmed: confirmed,
                });
            }
        }
        self.gesture_memory.retain_tracks(&live_ids);

        let night = self.handle.night();
        let override_active = self.handle.override_active(now);
        let eval = self.engine.evaluate(&signals, night, override_active);
        let verdict = &eval.verdict;

        match verdict.level {
            RiskLevel::Safe => {}
            RiskLevel::Warning => self.record(AlertLevel::Warning, &verdict.message),
            RiskLevel::Critical => {
                self.record(AlertLevel::Critical, &verdict.message);
                if let Some(record) = self.evidence.maybe_capture(frame, now) {
                    self.record(
                        AlertLevel::Info,
                        &format!("Evidence saved: {}", record.path.display()),
                    );
                }
            }
        }

        if eval.notify {
            let body = dispatch::format_notification(
                "Harassment risk detected",
                self.handle.location(),
                verdict.female_count,
                verdict.male_count,
            );
            self.handle.dispatch_notification(body, now);
        }

        self.handle
            .publish(StatusSnapshot {
                level: verdict.level,
                message: verdict.message.clone(),
                female_count: verdict.female_count,
                male_count: verdict.male_count,
                night,
                override_active,
                frames: self.frames,
                updated: Utc::now(),
            })
            .await;
    }

    fn record(&self, level: AlertLevel, message: &str) {
        if let Ok(mut alerts) = self.handle.alerts().lock() {
            alerts.record(level, message);
        }
    }

    /// Run until the frame stream is exhausted beyond recovery.
    ///
    /// Frame reads block, so they run under `block_in_place`; requires the
    /// multi-threaded runtime.
    pub async fn run(&mut self, source: &mut dyn FrameSource) -> Result<(), PipelineError> {
        info!("Pipeline running on {}", source.describe());
        loop {
            let frame = tokio::task::block_in_place(|| self.reconnect.acquire(source))?;
            self.process_frame(&frame).await;
        }
    }
}
