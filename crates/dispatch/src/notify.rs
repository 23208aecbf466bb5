//! Throttled outbound emergency notification

use crate::DispatchError;
use alerting::{AlertLevel, AlertLog};
use chrono::Utc;
use rumqttc::{AsyncClient, Event, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Notification error types
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Send failed: {0}")]
    Send(String),

    #[error("Notifier not connected")]
    NotConnected,
}

/// Outbound notification capability.
///
/// The dispatcher treats any non-success as failure without inspecting the
/// cause; the implementation is assumed to carry its own timeout.
pub trait Notifier: Send + Sync {
    fn send(&self, body: &str) -> Result<(), NotifyError>;
}

/// Notifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// MQTT broker host
    pub broker_url: String,
    /// MQTT port
    pub broker_port: u16,
    /// Camera/site identifier used in the client id
    pub camera_id: String,
    /// Topic emergency messages are published to
    pub topic: String,
    /// Minimum interval between attempts (seconds)
    pub throttle_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            broker_url: "localhost".to_string(),
            broker_port: 1883,
            camera_id: "unknown".to_string(),
            topic: "guardian/sos".to_string(),
            throttle_secs: 60,
        }
    }
}

/// MQTT-backed notifier.
pub struct MqttNotifier {
    client: AsyncClient,
    topic: String,
}

impl MqttNotifier {
    /// Connect to the broker and spawn the event-loop handler.
    pub async fn connect(config: &NotifierConfig) -> Result<Self, DispatchError> {
        // Duplicate client ids evict each other on most brokers
        let client_id = format!("guardian-{}-{}", config.camera_id, Uuid::new_v4().simple());
        let mut options = MqttOptions::new(client_id, &config.broker_url, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        // First poll drives the handshake; a refused broker fails here.
        match eventloop.poll().await {
            Ok(event) => debug!("MQTT handshake: {:?}", event),
            Err(e) => return Err(DispatchError::NotifierConnect(e.to_string())),
        }

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(incoming)) => {
                        debug!("MQTT incoming: {:?}", incoming);
                    }
                    Err(e) => {
                        error!("MQTT error: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                    _ => {}
                }
            }
        });

        info!("Connected to MQTT broker: {}", config.broker_url);
        Ok(Self {
            client,
            topic: config.topic.clone(),
        })
    }
}

impl Notifier for MqttNotifier {
    fn send(&self, body: &str) -> Result<(), NotifyError> {
        self.client
            .try_publish(&self.topic, QoS::AtLeastOnce, false, body.as_bytes())
            .map_err(|e| NotifyError::Send(e.to_string()))
    }
}

/// Recording notifier for tests.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<String>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl MockNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for MockNotifier {
    fn send(&self, body: &str) -> Result<(), NotifyError> {
        if self.fail.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(NotifyError::Send("mock failure".into()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(body.to_string());
        }
        Ok(())
    }
}

/// Format the outbound emergency message body.
pub fn format_notification(
    reason: &str,
    location: &str,
    female_count: usize,
    male_count: usize,
) -> String {
    format!(
        "SOS: {} at {} on {}. Counts: {} women, {} men.",
        reason,
        location,
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        female_count,
        male_count
    )
}

/// Throttled fire-and-forget notification dispatcher.
///
/// The throttle timestamp is stamped the moment an attempt is admitted, not
/// when the send completes, so the window is upper-bounded regardless of
/// network latency. Outcomes are logged through the shared alert log.
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    alerts: Arc<Mutex<AlertLog>>,
    throttle: Duration,
    last_attempt: Option<Instant>,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        alerts: Arc<Mutex<AlertLog>>,
        throttle: Duration,
    ) -> Self {
        Self {
            notifier,
            alerts,
            throttle,
            last_attempt: None,
        }
    }

    /// Attempt a notification. Returns `false` when the throttle window has
    /// not elapsed; otherwise stamps the attempt and spawns the send.
    pub fn dispatch(&mut self, body: String, now: Instant) -> bool {
        if let Some(last) = self.last_attempt {
            if now.duration_since(last) < self.throttle {
                debug!("Notification suppressed by throttle");
                return false;
            }
        }
        self.last_attempt = Some(now);

        let notifier = Arc::clone(&self.notifier);
        let alerts = Arc::clone(&self.alerts);
        tokio::spawn(async move {
            let outcome = notifier.send(&body);
            match &outcome {
                Ok(()) => info!("Emergency notification sent"),
                Err(e) => warn!("Emergency notification failed: {}", e),
            }
            if let Ok(mut log) = alerts.lock() {
                match outcome {
                    Ok(()) => log.record(AlertLevel::Info, "Emergency notification sent"),
                    Err(_) => log.record(AlertLevel::Warning, "Emergency notification failed"),
                };
            }
        });
        true
    }
}
