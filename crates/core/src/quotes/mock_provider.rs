//! In-memory market data provider for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use cedearfolio_market_data::{
    MarketDataError, MarketDataProvider, ProviderCapabilities, Quote, RateLimit,
};

#[derive(Default)]
pub struct MockProvider {
    history: HashMap<String, Vec<Quote>>,
    latest: HashMap<String, Decimal>,
    delay: Option<Duration>,
    min_delay: Duration,
    unavailable: bool,
    rate_limited: bool,
    batch: bool,
    pub history_calls: AtomicUsize,
    pub latest_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_close(mut self, symbol: &str, date: NaiveDate, close: Decimal) -> Self {
        let timestamp = Utc
            .from_utc_datetime(&date.and_hms_opt(14, 30, 0).unwrap());
        let quotes = self.history.entry(symbol.to_string()).or_default();
        quotes.push(Quote::new(symbol, timestamp, close, "MOCK"));
        quotes.sort_by_key(|q| q.timestamp);
        self
    }

    pub fn with_latest(mut self, symbol: &str, close: Decimal) -> Self {
        self.latest.insert(symbol.to_string(), close);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Advertised pause between request groups.
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// Every call fails as if credentials were rejected.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn rate_limited(mut self) -> Self {
        self.rate_limited = true;
        self
    }

    pub fn with_batch(mut self) -> Self {
        self.batch = true;
        self
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn latest_calls(&self) -> usize {
        self.latest_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    async fn preamble(&self) -> Result<(), MarketDataError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(MarketDataError::ProviderUnavailable {
                provider: "MOCK".to_string(),
                message: "credentials rejected".to_string(),
            });
        }
        if self.rate_limited {
            return Err(MarketDataError::RateLimited {
                provider: "MOCK".to_string(),
            });
        }
        Ok(())
    }

    fn range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, MarketDataError> {
        let quotes = self
            .history
            .get(symbol)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        let in_range: Vec<Quote> = quotes
            .iter()
            .filter(|q| q.timestamp >= start && q.timestamp <= end)
            .cloned()
            .collect();
        if in_range.is_empty() {
            return Err(MarketDataError::NoDataForRange);
        }
        Ok(in_range)
    }
}

#[async_trait]
impl MarketDataProvider for MockProvider {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_batch_history: self.batch,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            min_delay: self.min_delay,
            ..RateLimit::default()
        }
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        self.latest_calls.fetch_add(1, Ordering::SeqCst);
        self.preamble().await?;
        let close = self
            .latest
            .get(symbol)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))?;
        Ok(Quote::new(symbol, Utc::now(), *close, "MOCK"))
    }

    async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>, MarketDataError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.preamble().await?;
        self.range(symbol, start, end)
    }

    async fn get_historical_quotes_batch(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<HashMap<String, Vec<Quote>>, MarketDataError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if !self.batch {
            return Err(MarketDataError::NotSupported {
                operation: "batch history".to_string(),
                provider: "MOCK".to_string(),
            });
        }
        self.preamble().await?;
        Ok(symbols
            .iter()
            .filter_map(|s| self.range(s, start, end).ok().map(|q| (s.clone(), q)))
            .collect())
    }
}
