//! Per-IP rate limiting via GCRA
//!
//! tower_governor enforcement for the control endpoints, keyed by peer IP.

use governor::middleware::StateInformationMiddleware;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config with X-RateLimit-* response headers enabled
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Seconds per replenished request
    pub per_second: u64,
    /// Max requests admitted in a burst
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 1,
            burst_size: 10,
        }
    }
}

impl RateLimitConfig {
    /// Strict limits for the control endpoints
    pub fn strict() -> Self {
        Self {
            per_second: 2,
            burst_size: 3,
        }
    }
}

/// Build a governor config for `GovernorLayer`.
///
/// Uses PeerIpKeyExtractor, so the service must be driven with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_governor_config(config: &RateLimitConfig) -> Arc<DefaultGovernorConfig> {
    Arc::new(
        GovernorConfigBuilder::default()
            .per_second(config.per_second)
            .burst_size(config.burst_size)
            .use_headers()
            .finish()
            .unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_is_tighter_than_default() {
        let default = RateLimitConfig::default();
        let strict = RateLimitConfig::strict();
        assert!(strict.burst_size < default.burst_size);
    }

    #[test]
    fn test_create_governor_config() {
        let governor = create_governor_config(&RateLimitConfig::default());
        assert!(Arc::strong_count(&governor) > 0);
    }
}
