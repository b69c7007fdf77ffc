//! Error types and failure scoping for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`ErrorScope`]: Whether a failure concerns one quote or the whole source

mod scope;

pub use scope::ErrorScope;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Each variant is classified into an [`ErrorScope`] via the [`scope`](Self::scope)
/// method, which tells callers whether the failure only makes one price
/// unavailable or whether the provider as a whole cannot be reached.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// No data available for the requested date range.
    /// The symbol exists but has no quotes in the specified period.
    #[error("No data for date range")]
    NoDataForRange,

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The provider rejected our credentials or could not be initialized.
    #[error("Provider unavailable: {provider} - {message}")]
    ProviderUnavailable {
        /// The provider that is unavailable
        provider: String,
        /// Why the provider is unavailable
        message: String,
    },

    /// Data validation failed.
    /// The provider returned data that failed validation checks.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        /// Description of the validation failure
        message: String,
    },

    /// The requested operation is not supported by this provider.
    #[error("Operation '{operation}' not supported by {provider}")]
    NotSupported {
        /// The unsupported operation
        operation: String,
        /// The provider that does not support it
        provider: String,
    },

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl MarketDataError {
    /// Returns the failure scope for this error.
    ///
    /// - [`ErrorScope::Quote`]: only the requested price is unavailable;
    ///   callers apply their missing-price policy and carry on.
    /// - [`ErrorScope::Source`]: the provider itself cannot serve requests;
    ///   the current computation cannot produce trustworthy numbers.
    ///
    /// # Examples
    ///
    /// ```
    /// use cedearfolio_market_data::errors::{ErrorScope, MarketDataError};
    ///
    /// let error = MarketDataError::NoDataForRange;
    /// assert_eq!(error.scope(), ErrorScope::Quote);
    ///
    /// let error = MarketDataError::ProviderUnavailable {
    ///     provider: "YAHOO".to_string(),
    ///     message: "unauthorized".to_string(),
    /// };
    /// assert_eq!(error.scope(), ErrorScope::Source);
    /// ```
    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::SymbolNotFound(_)
            | Self::NoDataForRange
            | Self::Timeout { .. }
            | Self::RateLimited { .. }
            | Self::ValidationFailed { .. }
            | Self::NotSupported { .. }
            | Self::ProviderError { .. } => ErrorScope::Quote,

            Self::ProviderUnavailable { .. } => ErrorScope::Source,

            // Connection failures mean the provider is unreachable; a
            // per-request timeout is still just one missing quote.
            Self::Network(e) => {
                if e.is_timeout() {
                    ErrorScope::Quote
                } else {
                    ErrorScope::Source
                }
            }
        }
    }

    /// True when the provider answered that it has nothing for the request.
    ///
    /// Unlike a timeout or a rate limit, retrying will not change the answer.
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self,
            MarketDataError::SymbolNotFound(_) | MarketDataError::NoDataForRange
        )
    }
}
