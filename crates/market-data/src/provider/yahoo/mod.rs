//! Yahoo Finance market data provider.
//!
//! Used as the price oracle for the underlying foreign shares of
//! depositary receipts (e.g. AAPL, KO, BRK-B). Only daily closes are read.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

const PROVIDER_ID: &str = "YAHOO";

pub struct YahooProvider {
    connector: yahoo::YahooConnector,
}

impl YahooProvider {
    pub fn new() -> Result<Self, MarketDataError> {
        let connector =
            yahoo::YahooConnector::new().map_err(|e| MarketDataError::ProviderUnavailable {
                provider: PROVIDER_ID.to_string(),
                message: format!("Yahoo connector could not start: {}", e),
            })?;
        Ok(Self { connector })
    }

    fn to_offset(dt: DateTime<Utc>) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    /// "No quotes" from the connector means the symbol is unknown to Yahoo.
    fn map_error(symbol: &str, e: yahoo::YahooError) -> MarketDataError {
        match e {
            yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
                MarketDataError::SymbolNotFound(symbol.to_string())
            }
            other => MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Keeps the session timestamp and a strictly positive close.
    fn to_close(symbol: &str, bar: &yahoo::Quote) -> Option<Quote> {
        let timestamp = Utc.timestamp_opt(bar.timestamp as i64, 0).single()?;
        let close = Decimal::from_f64_retain(bar.close).filter(|c| *c > Decimal::ZERO)?;
        Some(Quote::new(symbol, timestamp, close, PROVIDER_ID))
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_batch_history: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            max_concurrency: 10,
            min_delay: Duration::from_millis(50),
        }
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        debug!("Latest close for {} from Yahoo", symbol);

        let response = self
            .connector
            .get_latest_quotes(symbol, "1d")
            .await
            .map_err(|e| Self::map_error(symbol, e))?;
        let bar = response
            .last_quote()
            .map_err(|e| Self::map_error(symbol, e))?;

        Self::to_close(symbol, &bar).ok_or_else(|| MarketDataError::ValidationFailed {
            message: format!("Unusable latest close {} for {}", bar.close, symbol),
        })
    }

    async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, MarketDataError> {
        debug!(
            "Daily closes for {} between {} and {} from Yahoo",
            symbol,
            start.date_naive(),
            end.date_naive()
        );

        let response = self
            .connector
            .get_quote_history(symbol, Self::to_offset(start), Self::to_offset(end))
            .await
            .map_err(|e| Self::map_error(symbol, e))?;

        let bars = match response.quotes() {
            Ok(bars) => bars,
            Err(yahoo::YahooError::NoQuotes) => return Err(MarketDataError::NoDataForRange),
            Err(e) => return Err(Self::map_error(symbol, e)),
        };

        let mut closes: Vec<Quote> = bars
            .iter()
            .filter_map(|bar| {
                let quote = Self::to_close(symbol, bar);
                if quote.is_none() {
                    warn!("Dropping unusable Yahoo bar for {}: close {}", symbol, bar.close);
                }
                quote
            })
            .collect();

        if closes.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }
        closes.sort_by_key(|q| q.timestamp);
        Ok(closes)
    }
}
