//! Cedearfolio Market Data Crate
//!
//! This crate provides provider-agnostic price fetching for the
//! Cedearfolio position engine.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Latest close and historical daily closes for listed equities
//! - A Yahoo Finance provider
//! - Symbol normalization between local listings and provider conventions
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +--------------------+
//! |  Local symbol    | --> |  SymbolNormalizer  |  (e.g. BRK.B -> BRK-B)
//! +------------------+     +--------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |    Provider      |  (Yahoo, mocks in tests)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |     Quote        |  (daily close)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Quote`] - Daily close quote
//! - [`SymbolNormalizer`] - Local <-> provider symbol mapping
//! - [`MarketDataProvider`] - Trait implemented by every price source

pub mod errors;
pub mod models;
pub mod provider;
pub mod symbol;

pub use errors::{ErrorScope, MarketDataError};
pub use models::Quote;
pub use provider::yahoo::YahooProvider;
pub use provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
pub use symbol::SymbolNormalizer;
