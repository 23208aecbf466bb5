//! Shared pipeline state
//!
//! The frame loop is the only writer of the status snapshot; the API and any
//! other observers read through [`PipelineHandle`]. Control inputs (night
//! context, manual override) flow the other way through the same handle.

use alerting::{AlertEvent, AlertLevel, AlertLog};
use chrono::{DateTime, Utc};
use dispatch::NotificationDispatcher;
use risk::engine::MSG_OVERRIDE;
use risk::{ManualOverride, RiskLevel};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Point-in-time view of the pipeline, refreshed once per frame.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub level: RiskLevel,
    pub message: String,
    pub female_count: usize,
    pub male_count: usize,
    pub night: bool,
    pub override_active: bool,
    /// Frames evaluated since startup
    pub frames: u64,
    pub updated: DateTime<Utc>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            level: RiskLevel::Safe,
            message: "Starting up".to_string(),
            female_count: 0,
            male_count: 0,
            night: false,
            override_active: false,
            frames: 0,
            updated: Utc::now(),
        }
    }
}

/// Handle shared between the frame loop and the control surface.
///
/// Locking discipline: the snapshot sits behind an async `RwLock` (read-mostly,
/// written once per frame); the override, alert log, and dispatcher use std
/// mutexes and are never held across an await.
pub struct PipelineHandle {
    snapshot: RwLock<StatusSnapshot>,
    night: AtomicBool,
    overrides: Mutex<ManualOverride>,
    alerts: Arc<Mutex<AlertLog>>,
    notifications: Mutex<NotificationDispatcher>,
    override_duration: Duration,
    location: String,
}

impl PipelineHandle {
    pub fn new(
        alerts: Arc<Mutex<AlertLog>>,
        notifications: NotificationDispatcher,
        override_duration: Duration,
        location: &str,
        night: bool,
    ) -> Self {
        Self {
            snapshot: RwLock::new(StatusSnapshot {
                night,
                ..StatusSnapshot::default()
            }),
            night: AtomicBool::new(night),
            overrides: Mutex::new(ManualOverride::new()),
            alerts,
            notifications: Mutex::new(notifications),
            override_duration,
            location: location.to_string(),
        }
    }

    /// Current status view.
    pub async fn status(&self) -> StatusSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Replace the status view. Called once per frame by the runner.
    pub async fn publish(&self, snapshot: StatusSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    pub fn night(&self) -> bool {
        self.night.load(Ordering::Relaxed)
    }

    /// Flip the night/low-visibility context flag.
    pub fn set_night(&self, night: bool) {
        let prev = self.night.swap(night, Ordering::Relaxed);
        if prev != night {
            info!("Night context set to {}", night);
        }
    }

    /// Whether the manual override is in force at `now`.
    pub fn override_active(&self, now: Instant) -> bool {
        self.overrides
            .lock()
            .map(|o| o.active(now))
            .unwrap_or(false)
    }

    /// Arm the manual override and attempt an immediate SOS notification.
    ///
    /// The alarm escalation itself happens on the next evaluated frame; this
    /// records the event and pushes the (throttled) outbound message right
    /// away so a dead camera does not silence an operator alert.
    pub fn trigger_manual_alert(&self) {
        let now = Instant::now();
        if let Ok(mut overrides) = self.overrides.lock() {
            overrides.trigger(now, self.override_duration);
        }
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.record(AlertLevel::Critical, MSG_OVERRIDE);
        }

        let body = format!(
            "SOS: Manual alert triggered at {} on {}.",
            self.location,
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
        let admitted = self
            .notifications
            .lock()
            .map(|mut d| d.dispatch(body, now))
            .unwrap_or(false);
        if !admitted {
            warn!("Manual SOS suppressed by throttle");
            if let Ok(mut alerts) = self.alerts.lock() {
                alerts.record(AlertLevel::Info, "Manual SOS suppressed (throttle)");
            }
        }
    }

    /// Disarm the manual override.
    pub fn clear_override(&self) {
        if let Ok(mut overrides) = self.overrides.lock() {
            overrides.clear();
        }
        info!("Manual override cleared");
    }

    /// Most recent alert events, newest first.
    pub fn events(&self, limit: usize) -> Vec<AlertEvent> {
        self.alerts
            .lock()
            .map(|a| a.recent(limit))
            .unwrap_or_default()
    }

    pub(crate) fn alerts(&self) -> &Arc<Mutex<AlertLog>> {
        &self.alerts
    }

    /// Attempt an automatic outbound notification, honoring the throttle.
    pub(crate) fn dispatch_notification(&self, body: String, now: Instant) -> bool {
        self.notifications
            .lock()
            .map(|mut d| d.dispatch(body, now))
            .unwrap_or(false)
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}
