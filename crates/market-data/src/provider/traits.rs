//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! market data providers must implement.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::MarketDataError;
use crate::models::Quote;

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for market data providers.
///
/// Implement this trait to add support for a new price source.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use cedearfolio_market_data::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
///
/// struct MyProvider {
///     api_key: String,
/// }
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             supports_batch_history: false,
///         }
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit::default()
///     }
///
///     // ... implement quote methods
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Should be a constant string like "YAHOO".
    /// Used for logging and error reporting.
    fn id(&self) -> &'static str;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Rate limiting configuration.
    fn rate_limit(&self) -> RateLimit;

    /// Fetch the latest daily close for a symbol.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Symbol in the provider's own convention
    ///
    /// # Returns
    ///
    /// The latest quote on success, or a `MarketDataError` on failure.
    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch historical daily quotes for a symbol.
    ///
    /// # Arguments
    ///
    /// * `symbol` - Symbol in the provider's own convention
    /// * `start` - Start of the date range (inclusive)
    /// * `end` - End of the date range (inclusive)
    ///
    /// # Returns
    ///
    /// Quotes ordered by timestamp ascending, or a `MarketDataError`.
    async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, MarketDataError>;

    /// Fetch historical daily quotes for several symbols in one request.
    ///
    /// Only called when [`ProviderCapabilities::supports_batch_history`] is set.
    /// The returned map is keyed by provider symbol; symbols without data
    /// are simply absent. Default implementation returns `NotSupported`.
    async fn get_historical_quotes_batch(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Quote>>, MarketDataError> {
        let _ = (symbols, start, end);
        Err(MarketDataError::NotSupported {
            operation: "batch history".to_string(),
            provider: self.id().to_string(),
        })
    }
}
