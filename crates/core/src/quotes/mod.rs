//! Price oracle adapter.
//!
//! This module wraps a market-data provider for the position engine:
//!
//! - [`oracle`] - Window lookups ("first close on or after D"), timeouts, batching
//! - [`cache`] - Explicit TTL cache owned by the oracle
//! - [`price_book`] - Immutable price snapshot read by the synchronous engine
//!
//! # Architecture
//!
//! ```text
//! PortfolioService → PriceOracle → market-data crate (provider)
//!        ↓               ↓
//!    PriceBook       QuoteCache
//! ```
//!
//! The engine never awaits: the oracle resolves every price a computation
//! needs up front and hands the result over as a [`PriceBook`].

pub mod cache;
pub mod oracle;
pub mod price_book;

pub use cache::{QuoteCache, QuoteKey};
pub use oracle::{HistoryRequest, PriceOracle};
pub use price_book::{PriceBook, PriceLookup};

#[cfg(test)]
pub(crate) mod mock_provider;
