//! Cedearfolio Core - position reconstruction for depositary-receipt portfolios.
//!
//! This crate turns a movement ledger of local depositary-receipt units
//! (e.g. CEDEARs) into positions on the underlying foreign shares, with USD
//! and local cost basis, valuation and realized results. Prices come from
//! the `cedearfolio-market-data` crate through the [`quotes::PriceOracle`].

pub mod constants;
pub mod errors;
pub mod ledger;
pub mod portfolio;
pub mod quotes;
pub mod settings;

// Re-export common types from the portfolio module
pub use portfolio::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
