use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Daily close of one symbol
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Provider symbol the quote belongs to
    pub symbol: String,

    /// Timestamp of the quote
    pub timestamp: DateTime<Utc>,

    /// Closing price in the provider's quote currency (USD for Yahoo)
    pub close: Decimal,

    /// Source of the quote (YAHOO, MOCK, etc.)
    pub source: String,
}

impl Quote {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        close: Decimal,
        source: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            close,
            source: source.into(),
        }
    }

    /// Calendar date (UTC) of the session the quote closes.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_new() {
        let quote = Quote::new("AAPL", Utc::now(), dec!(150.25), "YAHOO");
        assert_eq!(quote.symbol, "AAPL");
        assert_eq!(quote.close, dec!(150.25));
        assert_eq!(quote.source, "YAHOO");
    }

    #[test]
    fn test_quote_date_uses_utc_calendar_day() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 14, 30, 0).unwrap();
        let quote = Quote::new("KO", ts, dec!(60), "YAHOO");
        assert_eq!(quote.date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }
}
