//! Evidence & Notification Dispatcher
//!
//! Two categories of work are offloaded so the frame loop never stalls:
//! - evidence persistence: rate-limited JPEG snapshots of CRITICAL frames,
//!   written by a worker behind a bounded queue
//! - outbound notification: throttled emergency messages sent fire-and-forget
//!
//! Both are best-effort. Failures are logged through the alert log and never
//! propagate to the frame loop.

pub mod evidence;
pub mod notify;

pub use evidence::{EvidenceCapture, EvidenceConfig, EvidenceRecord};
pub use notify::{
    format_notification, MockNotifier, MqttNotifier, NotificationDispatcher, Notifier,
    NotifierConfig, NotifyError,
};

use thiserror::Error;

/// Dispatch error types
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Evidence directory unavailable: {0}")]
    EvidenceDir(String),

    #[error("Notifier connection failed: {0}")]
    NotifierConnect(String),
}
