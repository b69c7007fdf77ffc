//! Core error types for the Cedearfolio engine.
//!
//! Errors fall in two groups. Errors local to one security (a malformed row,
//! a missing price) are recorded in the report and never abort the run.
//! Errors about a data source as a whole abort the computation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use cedearfolio_market_data::{ErrorScope, MarketDataError};

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Price unavailable: {0}")]
    PriceUnavailable(String),

    #[error("Malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Position calculation failed: {0}")]
    Calculation(#[from] CalculatorError),

    #[error("Market data operation failed: {0}")]
    MarketData(MarketDataError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    pub fn price_unavailable(symbol: &str, date: Option<NaiveDate>) -> Self {
        match date {
            Some(d) => Error::PriceUnavailable(format!("{} on or after {}", symbol, d)),
            None => Error::PriceUnavailable(symbol.to_string()),
        }
    }
}

impl From<MarketDataError> for Error {
    fn from(err: MarketDataError) -> Self {
        match err.scope() {
            ErrorScope::Source => Error::DataSourceUnavailable(err.to_string()),
            ErrorScope::Quote => Error::MarketData(err),
        }
    }
}

/// Errors raised while folding a security's transactions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalculatorError {
    #[error("Sell of {requested} shares of {security_id} on {date} with no shares held")]
    OversoldPosition {
        security_id: String,
        date: NaiveDate,
        requested: Decimal,
    },

    #[error("No USD price for {symbol} on or after {date}")]
    MissingHistoricalPrice { symbol: String, date: NaiveDate },

    #[error("Arithmetic overflow computing {0}")]
    Overflow(String),
}

/// Validation errors for ledger records.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Failed to parse decimal number '{0}'")]
    DecimalParse(String),

    #[error("Failed to parse date '{0}'")]
    DateParse(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::DataSourceUnavailable(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::DataSourceUnavailable(format!("Unreadable ledger CSV: {}", err))
    }
}
