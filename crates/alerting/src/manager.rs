//! Alert log implementation

use crate::sink::AuditSink;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Bounded recent-events buffer size
pub const RECENT_CAPACITY: usize = 20;

/// Alert severity as recorded in the log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Info => "INFO",
            AlertLevel::Warning => "WARNING",
            AlertLevel::Critical => "CRITICAL",
        }
    }
}

/// One append-only audit record, also retained in the recent buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    pub timestamp: DateTime<Utc>,
    pub level: AlertLevel,
    pub message: String,
    pub location: String,
}

/// Debouncing alert log.
///
/// Receives a (level, message) every frame a condition holds. Identical
/// consecutive messages are discarded so a persisting condition produces one
/// event, not one per frame. Accepted events go most-recent-first into the
/// bounded buffer and to the audit sink; this is the sole audit-trail writer.
pub struct AlertLog {
    events: VecDeque<AlertEvent>,
    location: String,
    sink: Box<dyn AuditSink>,
}

impl AlertLog {
    pub fn new(location: &str, sink: Box<dyn AuditSink>) -> Self {
        Self {
            events: VecDeque::with_capacity(RECENT_CAPACITY),
            location: location.to_string(),
            sink,
        }
    }

    /// Record an alert. Returns the accepted event, or `None` when debounced.
    pub fn record(&mut self, level: AlertLevel, message: &str) -> Option<AlertEvent> {
        if let Some(last) = self.events.front() {
            if last.message == message {
                debug!("Alert debounced: {}", message);
                return None;
            }
        }

        let event = AlertEvent {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            location: self.location.clone(),
        };

        self.events.push_front(event.clone());
        self.events.truncate(RECENT_CAPACITY);

        // Audit failures degrade the trail, never the pipeline
        if let Err(e) = self.sink.append(&event) {
            warn!("Audit append failed: {}", e);
        }

        Some(event)
    }

    /// Most-recent-first view of the buffered events.
    pub fn recent(&self, limit: usize) -> Vec<AlertEvent> {
        self.events.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryAuditSink;
    use std::sync::Arc;

    fn log_with_memory_sink() -> (AlertLog, Arc<MemoryAuditSink>) {
        let sink = Arc::new(MemoryAuditSink::default());
        let log = AlertLog::new("Sector 4 Entrance", Box::new(Arc::clone(&sink)));
        (log, sink)
    }

    #[test]
    fn test_identical_consecutive_messages_debounced() {
        let (mut log, sink) = log_with_memory_sink();
        assert!(log.record(AlertLevel::Critical, "Woman surrounded by group").is_some());
        assert!(log.record(AlertLevel::Critical, "Woman surrounded by group").is_none());
        assert_eq!(log.len(), 1);
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_differing_messages_both_recorded() {
        let (mut log, sink) = log_with_memory_sink();
        log.record(AlertLevel::Warning, "Lone woman in low-visibility context");
        log.record(AlertLevel::Critical, "Erratic motion detected");
        assert_eq!(log.len(), 2);
        assert_eq!(sink.events().len(), 2);
        // Most recent first
        assert_eq!(log.recent(10)[0].message, "Erratic motion detected");
    }

    #[test]
    fn test_alternating_messages_are_not_debounced() {
        let (mut log, _) = log_with_memory_sink();
        log.record(AlertLevel::Info, "a");
        log.record(AlertLevel::Info, "b");
        log.record(AlertLevel::Info, "a");
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_buffer_capacity_drops_oldest() {
        let (mut log, sink) = log_with_memory_sink();
        for i in 0..30 {
            log.record(AlertLevel::Info, &format!("event {i}"));
        }
        assert_eq!(log.len(), RECENT_CAPACITY);
        assert_eq!(log.recent(1)[0].message, "event 29");
        // The audit trail keeps everything the buffer dropped
        assert_eq!(sink.events().len(), 30);
    }

    #[test]
    fn test_events_carry_location() {
        let (mut log, _) = log_with_memory_sink();
        let event = log.record(AlertLevel::Info, "x").unwrap();
        assert_eq!(event.location, "Sector 4 Entrance");
    }
}
