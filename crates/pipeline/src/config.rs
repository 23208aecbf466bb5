//! Pipeline configuration
//!
//! Layered loading: `guardian.toml` in the working directory (optional),
//! overridden by `GUARDIAN_`-prefixed environment variables
//! (e.g. `GUARDIAN_NOTIFIER__BROKER_URL`).

use detection::DetectionConfig;
use dispatch::{EvidenceConfig, NotifierConfig};
use gesture::GestureConfig;
use risk::RiskConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracker::TrackerConfig;
use video_ingest::{FrameSource, HttpSnapshotSource, IngestError, StubFrameSource};

/// Frame source kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Synthetic frames (demo, tests)
    Stub,
    /// HTTP snapshot camera
    HttpSnapshot,
}

/// Frame source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Snapshot URL (http-snapshot sources)
    pub url: String,
    /// Stub frame dimensions
    pub width: u32,
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Stub,
            url: "http://127.0.0.1:81/jpg".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

impl SourceConfig {
    /// Build the configured frame source.
    pub fn build(&self) -> Result<Box<dyn FrameSource>, IngestError> {
        match self.kind {
            SourceKind::Stub => Ok(Box::new(StubFrameSource::new(self.width, self.height))),
            SourceKind::HttpSnapshot => Ok(Box::new(HttpSnapshotSource::new(&self.url)?)),
        }
    }
}

/// Reconnect policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_ms: 500,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Camera location stamped into events and notifications
    pub location: String,
    /// Initial night-context flag
    pub night: bool,
    /// API bind address
    pub api_addr: String,
    /// Audit trail CSV path
    pub audit_log: PathBuf,
    /// Manual override duration (seconds)
    pub override_secs: u64,
    pub source: SourceConfig,
    pub reconnect: ReconnectConfig,
    pub detection: DetectionConfig,
    pub tracker: TrackerConfig,
    pub gesture: GestureConfig,
    pub risk: RiskConfig,
    pub evidence: EvidenceConfig,
    pub notifier: NotifierConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            location: "Sector 4 Entrance".to_string(),
            night: true,
            api_addr: "0.0.0.0:8080".to_string(),
            audit_log: PathBuf::from("security_events.csv"),
            override_secs: 10,
            source: SourceConfig::default(),
            reconnect: ReconnectConfig::default(),
            detection: DetectionConfig::default(),
            tracker: TrackerConfig::default(),
            gesture: GestureConfig::default(),
            risk: RiskConfig::default(),
            evidence: EvidenceConfig::default(),
            notifier: NotifierConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load `guardian.toml` (if present) with environment overrides.
    pub fn load() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("guardian").required(false))
            .add_source(config::Environment::with_prefix("GUARDIAN").separator("__"))
            .build()?;
        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_canonical_thresholds() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.risk.panic_speed, 50.0);
        assert_eq!(cfg.risk.proximity_threshold, 180.0);
        assert_eq!(cfg.gesture.confirm_frames, 10);
        assert_eq!(cfg.evidence.min_interval_secs, 3);
        assert_eq!(cfg.notifier.throttle_secs, 60);
        assert_eq!(cfg.override_secs, 10);
    }

    #[test]
    fn test_stub_source_builds() {
        let cfg = SourceConfig::default();
        assert!(cfg.build().is_ok());
    }
}
