//! Alerting System
//!
//! Provides per-frame alert debouncing, a bounded recent-events buffer, and
//! the append-only audit trail.

mod manager;
mod sink;

pub use manager::{AlertEvent, AlertLevel, AlertLog, RECENT_CAPACITY};
pub use sink::{AuditSink, CsvAuditSink, MemoryAuditSink};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Audit sink write failed: {0}")]
    Sink(String),
}
