//! Audit trail sinks

use crate::manager::AlertEvent;
use crate::AlertError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Append-only audit sink.
///
/// Records are never rewritten; a sink only ever appends.
pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AlertEvent) -> Result<(), AlertError>;
}

impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    fn append(&self, event: &AlertEvent) -> Result<(), AlertError> {
        (**self).append(event)
    }
}

/// CSV file audit sink: `timestamp,level,message,location` rows.
pub struct CsvAuditSink {
    path: PathBuf,
}

impl CsvAuditSink {
    /// Open (creating with a header row if absent) the audit file.
    pub fn new(path: &Path) -> Result<Self, AlertError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| AlertError::Sink(e.to_string()))?;
            }
            std::fs::write(path, "Timestamp,Level,Message,Location\n")
                .map_err(|e| AlertError::Sink(e.to_string()))?;
            info!("Created audit log at {}", path.display());
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl AuditSink for CsvAuditSink {
    fn append(&self, event: &AlertEvent) -> Result<(), AlertError> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| AlertError::Sink(e.to_string()))?;
        writeln!(
            file,
            "{},{},{},{}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.level.as_str(),
            escape_field(&event.message),
            escape_field(&event.location),
        )
        .map_err(|e| AlertError::Sink(e.to_string()))
    }
}

/// Quote a CSV field when it contains a delimiter or quote
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// In-memory audit sink for tests.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl MemoryAuditSink {
    pub fn events(&self) -> Vec<AlertEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, event: &AlertEvent) -> Result<(), AlertError> {
        self.events
            .lock()
            .map_err(|e| AlertError::Sink(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}
