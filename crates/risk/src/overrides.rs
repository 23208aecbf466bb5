//! Manual alarm override with an explicit expiry deadline

use std::time::{Duration, Instant};
use tracing::info;

/// Operator-triggered alarm override.
///
/// Stores an explicit expiry deadline computed at trigger time, so the
/// override always lasts exactly its configured duration regardless of when
/// it was raised. Past the deadline it is inert; the next frame's verdict
/// reverts to whatever the underlying signals indicate.
#[derive(Debug, Clone, Default)]
pub struct ManualOverride {
    expires_at: Option<Instant>,
}

impl ManualOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the override until `now + duration`.
    pub fn trigger(&mut self, now: Instant, duration: Duration) {
        info!("Manual override armed for {:?}", duration);
        self.expires_at = Some(now + duration);
    }

    /// Whether the override is in force at `now`.
    pub fn active(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now < deadline,
            None => false,
        }
    }

    /// Disarm immediately.
    pub fn clear(&mut self) {
        self.expires_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_by_default() {
        let ovr = ManualOverride::new();
        assert!(!ovr.active(Instant::now()));
    }

    #[test]
    fn test_active_until_deadline_then_clears() {
        let mut ovr = ManualOverride::new();
        let start = Instant::now();
        ovr.trigger(start, Duration::from_secs(10));

        assert!(ovr.active(start));
        assert!(ovr.active(start + Duration::from_secs(9)));
        // Deadline reached: auto-clear without any wall-clock modulus
        assert!(!ovr.active(start + Duration::from_secs(10)));
        assert!(!ovr.active(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_retrigger_extends_deadline() {
        let mut ovr = ManualOverride::new();
        let start = Instant::now();
        ovr.trigger(start, Duration::from_secs(10));
        ovr.trigger(start + Duration::from_secs(8), Duration::from_secs(10));
        assert!(ovr.active(start + Duration::from_secs(15)));
        assert!(!ovr.active(start + Duration::from_secs(18)));
    }

    #[test]
    fn test_clear_disarms() {
        let mut ovr = ManualOverride::new();
        let start = Instant::now();
        ovr.trigger(start, Duration::from_secs(10));
        ovr.clear();
        assert!(!ovr.active(start + Duration::from_secs(1)));
    }
}
