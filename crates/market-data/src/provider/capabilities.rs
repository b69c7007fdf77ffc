//! Provider capabilities and rate limiting configuration.
//!
//! This module defines structures for describing what a market data provider
//! can do and how hard it may be called.

use std::time::Duration;

/// Describes the capabilities of a market data provider.
#[derive(Clone, Debug, Default)]
pub struct ProviderCapabilities {
    /// Whether one request can return history for several symbols.
    pub supports_batch_history: bool,
}

/// Rate limiting configuration for a provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting their rate limits and getting blocked.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Maximum concurrent requests to this provider.
    pub max_concurrency: usize,

    /// Pause between consecutive groups of concurrent requests.
    pub min_delay: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            min_delay: Duration::from_millis(100),
        }
    }
}
