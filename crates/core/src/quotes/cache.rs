//! TTL cache for resolved prices.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;

/// What a cached price answers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QuoteKey {
    /// First close on or after `date` for `symbol`.
    Close { symbol: String, date: NaiveDate },
    /// Latest close for `symbol`.
    Latest { symbol: String },
}

impl QuoteKey {
    pub fn close(symbol: &str, date: NaiveDate) -> Self {
        QuoteKey::Close {
            symbol: symbol.to_string(),
            date,
        }
    }

    pub fn latest(symbol: &str) -> Self {
        QuoteKey::Latest {
            symbol: symbol.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
struct CacheEntry {
    /// `None` records a definitive "no data" answer from the provider.
    price: Option<Decimal>,
    inserted_at: Instant,
}

/// Price cache with time-based expiry.
///
/// A hit returns `Some(price)` where `price` may itself be `None` for a
/// remembered "no data" answer.
#[derive(Debug)]
pub struct QuoteCache {
    entries: DashMap<QuoteKey, CacheEntry>,
    ttl: Duration,
}

impl QuoteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &QuoteKey) -> Option<Option<Decimal>> {
        let fresh = {
            let entry = self.entries.get(key)?;
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.price);
            }
            false
        };
        if !fresh {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: QuoteKey, price: Option<Decimal>) {
        self.entries.insert(
            key,
            CacheEntry {
                price,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drops every entry.
    pub fn invalidate(&self) {
        self.entries.clear();
    }

    /// Drops expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
