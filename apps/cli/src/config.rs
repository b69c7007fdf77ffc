use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};

use cedearfolio_core::settings::{MissingPricePolicy, PortfolioSettings, ReportCurrency};

/// Where the movement ledger is read from.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerLocation {
    /// Directory holding `<table>.csv` files.
    Dir(PathBuf),
    /// Published spreadsheet CSV export; the template contains `{table}`.
    Url {
        template: String,
        token: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "table" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => bail!("unknown output format '{}'", other),
        }
    }
}

pub struct Config {
    pub ledger: LedgerLocation,
    pub ledger_timeout: Duration,
    pub settings: PortfolioSettings,
    pub output: OutputFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let ledger = match (var("CEDEAR_LEDGER_URL"), var("CEDEAR_LEDGER_DIR")) {
            (Some(template), _) => LedgerLocation::Url {
                template,
                token: var("CEDEAR_LEDGER_TOKEN"),
            },
            (None, Some(dir)) => LedgerLocation::Dir(PathBuf::from(dir)),
            (None, None) => LedgerLocation::Dir(PathBuf::from("./ledger")),
        };

        let defaults = PortfolioSettings::default();
        let settings = PortfolioSettings {
            ledger_table: var("CEDEAR_LEDGER_TABLE").unwrap_or(defaults.ledger_table.clone()),
            lookahead_days: parse_var("CEDEAR_LOOKAHEAD_DAYS", defaults.lookahead_days)?,
            quote_ttl_secs: parse_var("CEDEAR_QUOTE_TTL_SECS", defaults.quote_ttl_secs)?,
            oracle_timeout_ms: parse_var("CEDEAR_ORACLE_TIMEOUT_MS", defaults.oracle_timeout_ms)?,
            max_concurrency: parse_var("CEDEAR_MAX_CONCURRENCY", defaults.max_concurrency)?,
            missing_price_policy: match var("CEDEAR_MISSING_PRICE_POLICY") {
                Some(v) => MissingPricePolicy::from_str(&v)?,
                None => defaults.missing_price_policy,
            },
            closed_position_currency: match var("CEDEAR_CLOSED_CURRENCY") {
                Some(v) => ReportCurrency::from_str(&v)?,
                None => defaults.closed_position_currency,
            },
            ..defaults
        };
        settings.validate()?;

        let output = match var("CEDEAR_OUTPUT") {
            Some(v) => v.parse()?,
            None => OutputFormat::Text,
        };
        let timeout_ms: u64 = parse_var("CEDEAR_LEDGER_TIMEOUT_MS", 30_000)?;

        Ok(Self {
            ledger,
            ledger_timeout: Duration::from_millis(timeout_ms),
            settings,
            output,
        })
    }
}

/// Non-empty environment variable.
fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid {}: '{}'", name, raw)),
        None => Ok(default),
    }
}
