//! Rate Limiting for Prediction Routes
//!
//! Per-client-IP GCRA limiting through tower_governor. Peer IPs come from
//! `ConnectInfo`, so the server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()`.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tracing::warn;

/// Governor config with `X-RateLimit-*` headers enabled
pub type PredictGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests that can be made immediately
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 10,
        }
    }
}

/// Build the governor config, or `None` when limiting is disabled or the
/// quota is zero
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<PredictGovernorConfig>> {
    if !config.enabled {
        return None;
    }

    let governor = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish();

    if governor.is_none() {
        warn!(
            "Rate limit disabled: invalid quota (per_second={}, burst_size={})",
            config.per_second, config.burst_size
        );
    }
    governor.map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert!(create_governor_config(&config).is_some());
    }

    #[test]
    fn test_disabled_config() {
        let config = RateLimitConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(create_governor_config(&config).is_none());
    }

    #[test]
    fn test_zero_quota_is_rejected() {
        let config = RateLimitConfig {
            per_second: 0,
            ..Default::default()
        };
        assert!(create_governor_config(&config).is_none());
    }
}
