mod config;
mod render;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use cedearfolio_core::ledger::{CsvLedgerSource, HttpCsvLedgerSource, LedgerSource};
use cedearfolio_core::portfolio::{PortfolioService, PortfolioServiceTrait};
use cedearfolio_market_data::YahooProvider;
use config::{Config, LedgerLocation, OutputFormat};

fn init_tracing() {
    let log_format = std::env::var("CEDEAR_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries only the report
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn build_ledger(config: &Config) -> anyhow::Result<Arc<dyn LedgerSource>> {
    let ledger: Arc<dyn LedgerSource> = match &config.ledger {
        LedgerLocation::Dir(dir) => {
            tracing::info!("Reading ledger from {}", dir.display());
            Arc::new(CsvLedgerSource::new(dir))
        }
        LedgerLocation::Url { template, token } => Arc::new(HttpCsvLedgerSource::new(
            template.clone(),
            token.clone(),
            config.ledger_timeout,
        )?),
    };
    Ok(ledger)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let ledger = build_ledger(&config)?;
    let provider = Arc::new(YahooProvider::new()?);
    let service = PortfolioService::new(ledger, provider, config.settings.clone())?;

    let report = service
        .build_report()
        .await
        .context("Could not build the portfolio report")?;

    let output = match config.output {
        OutputFormat::Text => render::to_text(&report),
        OutputFormat::Json => render::to_json(&report)?,
    };
    println!("{}", output);
    Ok(())
}
