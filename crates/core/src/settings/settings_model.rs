use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cedearfolio_market_data::symbol::{LOCAL_SEPARATOR, ORACLE_SEPARATOR};
use cedearfolio_market_data::SymbolNormalizer;

use crate::constants::{
    DEFAULT_LEDGER_TABLE, DEFAULT_LOOKAHEAD_DAYS, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_ORACLE_TIMEOUT_MS, DEFAULT_QUOTE_TTL_SECS, MIN_LOOKAHEAD_DAYS,
};
use crate::errors::{Error, Result};

/// What to do with a BUY whose historical close cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingPricePolicy {
    /// Price the leg at the latest close and record a note.
    #[default]
    UseLatest,
    /// Drop the transaction from the fold and report it.
    Exclude,
}

impl FromStr for MissingPricePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "use_latest" | "latest" => Ok(Self::UseLatest),
            "exclude" | "skip" => Ok(Self::Exclude),
            other => Err(Error::InvalidConfigValue(format!(
                "unknown missing price policy '{}'",
                other
            ))),
        }
    }
}

/// Unit used for closed-position reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportCurrency {
    #[default]
    Local,
    Usd,
}

impl FromStr for ReportCurrency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "ars" => Ok(Self::Local),
            "usd" => Ok(Self::Usd),
            other => Err(Error::InvalidConfigValue(format!(
                "unknown report currency '{}'",
                other
            ))),
        }
    }
}

/// Column names of the movement ledger.
///
/// Header matching ignores case, surrounding whitespace and accents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerColumns {
    pub security: String,
    pub date: String,
    pub operation: String,
    pub quantity: String,
    pub ratio: String,
    pub amount: String,
    pub description: String,
    pub oracle_symbol: String,
}

impl Default for LedgerColumns {
    fn default() -> Self {
        Self {
            security: "Ticker".to_string(),
            date: "Fecha".to_string(),
            operation: "Operacion".to_string(),
            quantity: "Cantidad".to_string(),
            ratio: "Ratio".to_string(),
            amount: "Monto".to_string(),
            description: "Descripcion".to_string(),
            oracle_symbol: "Ticker_EEUU".to_string(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioSettings {
    pub ledger_table: String,
    pub columns: LedgerColumns,
    pub lookahead_days: u32,
    pub quote_ttl_secs: u64,
    pub oracle_timeout_ms: u64,
    pub max_concurrency: usize,
    pub missing_price_policy: MissingPricePolicy,
    pub closed_position_currency: ReportCurrency,
    pub local_separator: char,
    pub oracle_separator: char,
}

impl Default for PortfolioSettings {
    fn default() -> Self {
        Self {
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            columns: LedgerColumns::default(),
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            quote_ttl_secs: DEFAULT_QUOTE_TTL_SECS,
            oracle_timeout_ms: DEFAULT_ORACLE_TIMEOUT_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            missing_price_policy: MissingPricePolicy::default(),
            closed_position_currency: ReportCurrency::default(),
            local_separator: LOCAL_SEPARATOR,
            oracle_separator: ORACLE_SEPARATOR,
        }
    }
}

impl PortfolioSettings {
    pub fn validate(&self) -> Result<()> {
        if self.ledger_table.trim().is_empty() {
            return Err(Error::InvalidConfigValue(
                "ledger table name is empty".to_string(),
            ));
        }
        if self.lookahead_days < MIN_LOOKAHEAD_DAYS {
            return Err(Error::InvalidConfigValue(format!(
                "lookahead_days must be at least {}, got {}",
                MIN_LOOKAHEAD_DAYS, self.lookahead_days
            )));
        }
        if self.oracle_timeout_ms == 0 {
            return Err(Error::InvalidConfigValue(
                "oracle_timeout_ms must be positive".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConfigValue(
                "max_concurrency must be positive".to_string(),
            ));
        }
        if self.local_separator == self.oracle_separator {
            return Err(Error::InvalidConfigValue(
                "local and oracle symbol separators must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn symbol_normalizer(&self) -> SymbolNormalizer {
        SymbolNormalizer::new(self.local_separator, self.oracle_separator)
    }

    pub fn quote_ttl(&self) -> Duration {
        Duration::from_secs(self.quote_ttl_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = PortfolioSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.lookahead_days, 5);
        assert_eq!(settings.quote_ttl(), Duration::from_secs(3600));
        assert_eq!(settings.missing_price_policy, MissingPricePolicy::UseLatest);
        assert_eq!(settings.closed_position_currency, ReportCurrency::Local);
    }

    #[test]
    fn test_short_lookahead_is_rejected() {
        let settings = PortfolioSettings {
            lookahead_days: 2,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(Error::InvalidConfigValue(_))
        ));
    }

    #[test]
    fn test_equal_separators_are_rejected() {
        let settings = PortfolioSettings {
            oracle_separator: '.',
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_policy_and_currency_parsing() {
        assert_eq!(
            "use-latest".parse::<MissingPricePolicy>().unwrap(),
            MissingPricePolicy::UseLatest
        );
        assert_eq!(
            " EXCLUDE ".parse::<MissingPricePolicy>().unwrap(),
            MissingPricePolicy::Exclude
        );
        assert!("zero".parse::<MissingPricePolicy>().is_err());
        assert_eq!("usd".parse::<ReportCurrency>().unwrap(), ReportCurrency::Usd);
        assert_eq!("ARS".parse::<ReportCurrency>().unwrap(), ReportCurrency::Local);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: PortfolioSettings =
            serde_json::from_str(r#"{"lookaheadDays": 7, "missingPricePolicy": "EXCLUDE"}"#)
                .unwrap();
        assert_eq!(settings.lookahead_days, 7);
        assert_eq!(settings.missing_price_policy, MissingPricePolicy::Exclude);
        assert_eq!(settings.columns, LedgerColumns::default());
    }
}
