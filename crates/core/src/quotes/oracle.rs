//! Price oracle adapter over a [`MarketDataProvider`].
//!
//! Answers two questions for the engine:
//! - the first close on or after a date, looking at most `lookahead_days` ahead
//!   (weekends and market holidays have no close of their own);
//! - the latest close.
//!
//! Every provider call is bounded by a timeout. A timeout, a rate limit or an
//! empty window only makes that price unavailable; a provider that cannot be
//! reached at all fails the computation with `Error::DataSourceUnavailable`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use cedearfolio_market_data::{ErrorScope, MarketDataError, MarketDataProvider, Quote};

use super::{PriceBook, QuoteCache, QuoteKey};
use crate::errors::{Error, Result};
use crate::settings::PortfolioSettings;

/// Dates whose historical close is needed, per oracle symbol.
pub type HistoryRequest = BTreeMap<String, BTreeSet<NaiveDate>>;

type ResolvedCloses = HashMap<(String, NaiveDate), Option<Decimal>>;

/// Outcome of one provider call once source-level failures are split off.
enum Fetched<T> {
    Data(T),
    /// The provider answered definitively that there is nothing to return.
    NoData,
    /// Timeout, rate limit or a provider hiccup. Not remembered.
    Transient,
}

pub struct PriceOracle {
    provider: Arc<dyn MarketDataProvider>,
    cache: QuoteCache,
    lookahead_days: u32,
    timeout: Duration,
    max_concurrency: usize,
    min_delay: Duration,
}

impl PriceOracle {
    pub fn new(provider: Arc<dyn MarketDataProvider>, settings: &PortfolioSettings) -> Result<Self> {
        settings.validate()?;
        let rate_limit = provider.rate_limit();
        let max_concurrency = settings.max_concurrency.min(rate_limit.max_concurrency).max(1);

        Ok(Self {
            cache: QuoteCache::new(settings.quote_ttl()),
            lookahead_days: settings.lookahead_days,
            timeout: settings.oracle_timeout(),
            max_concurrency,
            min_delay: rate_limit.min_delay,
            provider,
        })
    }

    pub fn provider_id(&self) -> &'static str {
        self.provider.id()
    }

    pub fn lookahead_days(&self) -> u32 {
        self.lookahead_days
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Forgets every cached price.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// First close on or after `date`, within `[date, date + lookahead_days]`.
    pub async fn historical_close(&self, symbol: &str, date: NaiveDate) -> Result<Option<Decimal>> {
        let key = QuoteKey::close(symbol, date);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let end = self.window_end(date);
        let result = self
            .with_timeout(self.provider.get_historical_quotes(
                symbol,
                start_of_day(date),
                end_of_day(end),
            ))
            .await;

        let price = match self.settle(symbol, result)? {
            Fetched::Data(quotes) => first_close_in_window(&quotes, date, end),
            Fetched::NoData => None,
            Fetched::Transient => return Ok(None),
        };
        self.cache.insert(key, price);
        Ok(price)
    }

    /// Most recent close. Fails with `Error::PriceUnavailable` when there is none.
    pub async fn latest_close(&self, symbol: &str) -> Result<Decimal> {
        self.try_latest_close(symbol)
            .await?
            .ok_or_else(|| Error::price_unavailable(symbol, None))
    }

    async fn try_latest_close(&self, symbol: &str) -> Result<Option<Decimal>> {
        let key = QuoteKey::latest(symbol);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let result = self
            .with_timeout(self.provider.get_latest_quote(symbol))
            .await;

        let price = match self.settle(symbol, result)? {
            Fetched::Data(quote) if quote.close > Decimal::ZERO => Some(quote.close),
            Fetched::Data(_) | Fetched::NoData => None,
            Fetched::Transient => return Ok(None),
        };
        self.cache.insert(key, price);
        Ok(price)
    }

    /// Resolves every requested (symbol, date) window.
    ///
    /// One range request per symbol covers all of its dates; symbols are
    /// fetched concurrently, at most `max_concurrency` at a time. Providers
    /// with batch support get a single request for all symbols.
    pub async fn prefetch_history(&self, requests: &HistoryRequest) -> Result<ResolvedCloses> {
        let mut resolved = ResolvedCloses::new();
        let mut pending: Vec<(&str, Vec<NaiveDate>)> = Vec::new();

        for (symbol, dates) in requests {
            let mut missing = Vec::new();
            for &date in dates {
                match self.cache.get(&QuoteKey::close(symbol, date)) {
                    Some(price) => {
                        resolved.insert((symbol.clone(), date), price);
                    }
                    None => missing.push(date),
                }
            }
            if !missing.is_empty() {
                pending.push((symbol.as_str(), missing));
            }
        }

        if pending.is_empty() {
            debug!("All {} historical windows served from cache", resolved.len());
            return Ok(resolved);
        }

        if self.provider.capabilities().supports_batch_history {
            if let Some(batch) = self.prefetch_batch(&pending).await? {
                resolved.extend(batch);
                return Ok(resolved);
            }
        }

        info!(
            "Fetching price history for {} symbols from {}",
            pending.len(),
            self.provider.id()
        );
        for (index, chunk) in pending.chunks(self.max_concurrency).enumerate() {
            self.pace(index).await;
            let fetches = chunk
                .iter()
                .map(|(symbol, dates)| self.prefetch_symbol(symbol, dates));
            for result in join_all(fetches).await {
                resolved.extend(result?);
            }
        }

        Ok(resolved)
    }

    async fn prefetch_symbol(&self, symbol: &str, dates: &[NaiveDate]) -> Result<ResolvedCloses> {
        let (Some(&first), Some(&last)) = (dates.iter().min(), dates.iter().max()) else {
            return Ok(ResolvedCloses::new());
        };

        let result = self
            .with_timeout(self.provider.get_historical_quotes(
                symbol,
                start_of_day(first),
                end_of_day(self.window_end(last)),
            ))
            .await;

        Ok(match self.settle(symbol, result)? {
            Fetched::Data(quotes) => self.resolve_windows(symbol, dates, &quotes),
            Fetched::NoData => self.resolve_windows(symbol, dates, &[]),
            Fetched::Transient => dates
                .iter()
                .map(|&date| ((symbol.to_string(), date), None))
                .collect(),
        })
    }

    /// Returns `None` when the batch call failed softly and per-symbol
    /// fetching should be used instead.
    async fn prefetch_batch(&self, pending: &[(&str, Vec<NaiveDate>)]) -> Result<Option<ResolvedCloses>> {
        let first = pending.iter().flat_map(|(_, d)| d.iter()).min().copied();
        let last = pending.iter().flat_map(|(_, d)| d.iter()).max().copied();
        let (Some(first), Some(last)) = (first, last) else {
            return Ok(Some(ResolvedCloses::new()));
        };

        let symbols: Vec<String> = pending.iter().map(|(s, _)| s.to_string()).collect();
        info!(
            "Fetching price history for {} symbols from {} in one batch",
            symbols.len(),
            self.provider.id()
        );

        let result = self
            .with_timeout(self.provider.get_historical_quotes_batch(
                &symbols,
                start_of_day(first),
                end_of_day(self.window_end(last)),
            ))
            .await;

        let by_symbol = match self.settle("batch", result)? {
            Fetched::Data(map) => map,
            Fetched::NoData => HashMap::new(),
            Fetched::Transient => return Ok(None),
        };

        let mut resolved = ResolvedCloses::new();
        for (symbol, dates) in pending {
            let quotes = by_symbol.get(*symbol).map(Vec::as_slice).unwrap_or(&[]);
            resolved.extend(self.resolve_windows(symbol, dates, quotes));
        }
        Ok(Some(resolved))
    }

    /// Latest close for each symbol; `None` where the provider has none.
    pub async fn latest_closes(&self, symbols: &BTreeSet<String>) -> Result<HashMap<String, Option<Decimal>>> {
        let symbols: Vec<&String> = symbols.iter().collect();
        let mut prices = HashMap::with_capacity(symbols.len());

        for (index, chunk) in symbols.chunks(self.max_concurrency).enumerate() {
            self.pace(index).await;
            let fetches = chunk.iter().map(|symbol| async move {
                let price = self.try_latest_close(symbol).await;
                (symbol.to_string(), price)
            });
            for (symbol, price) in join_all(fetches).await {
                prices.insert(symbol, price?);
            }
        }

        Ok(prices)
    }

    /// Resolves all historical windows and latest closes into one snapshot.
    pub async fn build_price_book(
        &self,
        history: &HistoryRequest,
        latest: &BTreeSet<String>,
    ) -> Result<PriceBook> {
        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!("Dropped {} expired cached prices", purged);
        }

        let (closes, latest_prices) =
            futures::try_join!(self.prefetch_history(history), self.latest_closes(latest))?;

        let mut book = PriceBook::new();
        for ((symbol, date), price) in closes {
            if let Some(price) = price {
                book.insert_close(symbol, date, price);
            }
        }
        for (symbol, price) in latest_prices {
            if let Some(price) = price {
                book.insert_latest(symbol, price);
            }
        }

        debug!(
            "Price book ready: {} historical closes, {} latest closes",
            book.close_count(),
            book.latest_count()
        );
        Ok(book)
    }

    fn resolve_windows(&self, symbol: &str, dates: &[NaiveDate], quotes: &[Quote]) -> ResolvedCloses {
        dates
            .iter()
            .map(|&date| {
                let price = first_close_in_window(quotes, date, self.window_end(date));
                self.cache.insert(QuoteKey::close(symbol, date), price);
                ((symbol.to_string(), date), price)
            })
            .collect()
    }

    /// Waits the provider's `min_delay` before every request group but the first.
    async fn pace(&self, group: usize) {
        if group > 0 && !self.min_delay.is_zero() {
            tokio::time::sleep(self.min_delay).await;
        }
    }

    fn window_end(&self, date: NaiveDate) -> NaiveDate {
        date.checked_add_days(Days::new(u64::from(self.lookahead_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    async fn with_timeout<T, F>(&self, call: F) -> std::result::Result<T, MarketDataError>
    where
        F: Future<Output = std::result::Result<T, MarketDataError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout {
                provider: self.provider.id().to_string(),
            }),
        }
    }

    fn settle<T>(&self, symbol: &str, result: std::result::Result<T, MarketDataError>) -> Result<Fetched<T>> {
        match result {
            Ok(data) => Ok(Fetched::Data(data)),
            Err(err) if err.scope() == ErrorScope::Source => Err(err.into()),
            Err(err) if err.is_missing_data() => {
                debug!("No price data for {}", symbol);
                Ok(Fetched::NoData)
            }
            Err(err @ MarketDataError::NotSupported { .. }) => {
                debug!("{}", err);
                Ok(Fetched::Transient)
            }
            Err(err) => {
                warn!("Price for {} unavailable: {}", symbol, err);
                Ok(Fetched::Transient)
            }
        }
    }
}

/// Earliest positive close dated within `[date, end]`.
fn first_close_in_window(quotes: &[Quote], date: NaiveDate, end: NaiveDate) -> Option<Decimal> {
    quotes
        .iter()
        .filter(|q| q.close > Decimal::ZERO)
        .filter(|q| {
            let day = q.date();
            day >= date && day <= end
        })
        .min_by_key(|q| q.timestamp)
        .map(|q| q.close)
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let next = date.succ_opt().unwrap_or(date);
    next.and_time(NaiveTime::MIN).and_utc() - chrono::Duration::seconds(1)
}
