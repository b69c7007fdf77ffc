use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Synchronous price reads used by the position engine and the reconciler.
pub trait PriceLookup: Send + Sync {
    /// First close on or after `date` within the oracle's look-ahead window.
    fn historical_close(&self, symbol: &str, date: NaiveDate) -> Option<Decimal>;

    /// Most recent close.
    fn latest_close(&self, symbol: &str) -> Option<Decimal>;
}

/// Immutable snapshot of every price a computation needs.
///
/// Built once by [`PriceOracle::build_price_book`](super::PriceOracle::build_price_book)
/// and then shared read-only across the parallel per-security folds.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    closes: HashMap<(String, NaiveDate), Decimal>,
    latest: HashMap<String, Decimal>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_close(&mut self, symbol: impl Into<String>, date: NaiveDate, price: Decimal) {
        self.closes.insert((symbol.into(), date), price);
    }

    pub fn insert_latest(&mut self, symbol: impl Into<String>, price: Decimal) {
        self.latest.insert(symbol.into(), price);
    }

    pub fn with_close(mut self, symbol: &str, date: NaiveDate, price: Decimal) -> Self {
        self.insert_close(symbol, date, price);
        self
    }

    pub fn with_latest(mut self, symbol: &str, price: Decimal) -> Self {
        self.insert_latest(symbol, price);
        self
    }

    pub fn close_count(&self) -> usize {
        self.closes.len()
    }

    pub fn latest_count(&self) -> usize {
        self.latest.len()
    }
}

impl PriceLookup for PriceBook {
    fn historical_close(&self, symbol: &str, date: NaiveDate) -> Option<Decimal> {
        self.closes.get(&(symbol.to_string(), date)).copied()
    }

    fn latest_close(&self, symbol: &str) -> Option<Decimal> {
        self.latest.get(symbol).copied()
    }
}
