use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;

use super::*;
use crate::errors::{Error, Result};
use crate::ledger::{LedgerSource, Operation, RawRecord, Transaction};
use crate::quotes::mock_provider::MockProvider;
use crate::settings::{PortfolioSettings, ReportCurrency};

struct MemoryLedger {
    records: Vec<RawRecord>,
}

#[async_trait]
impl LedgerSource for MemoryLedger {
    async fn fetch_all(&self, table: &str) -> Result<Vec<RawRecord>> {
        if table != "Movimientos" {
            return Err(Error::DataSourceUnavailable(format!("no table {}", table)));
        }
        Ok(self.records.clone())
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn row(ticker: &str, fecha: &str, op: &str, qty: &str, ratio: &str, monto: &str) -> RawRecord {
    [
        ("Ticker", json!(ticker)),
        ("Fecha", json!(fecha)),
        ("Operacion", json!(op)),
        ("Cantidad", json!(qty)),
        ("Ratio", json!(ratio)),
        ("Monto", json!(monto)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn ledger() -> Vec<RawRecord> {
    vec![
        row("KO", "2024-01-10", "Compra", "100", "10", "500000"),
        row("KO", "12/02/2024", "Compra", "50", "10", "300000"),
        row("KO", "2024-03-11", "Venta", "30", "10", "210000"),
        row("MELI", "2024-01-10", "compra", "20", "10", "600"),
        row("MELI", "2024-02-01", "COMPRA", "10", "10", "400"),
        row("MELI", "2024-05-02", "venta", "30", "10", "1300"),
        row("AAPL", "2024-01-10", "Compra", "20", "20", "190000"),
        row("KO", "2024-03-12", "Dividendo", "1", "10", "100"),
        row("BRK.B", "2024-01-10", "Compra", "20", "20", "380000"),
        row("SPY", "2024-01-10", "Venta", "10", "20", "500000"),
    ]
}

fn provider() -> MockProvider {
    MockProvider::new()
        .with_close("KO", date(2024, 1, 10), dec!(50))
        .with_close("KO", date(2024, 2, 12), dec!(60))
        .with_latest("KO", dec!(70))
        .with_close("MELI", date(2024, 1, 10), dec!(1500))
        .with_close("MELI", date(2024, 2, 1), dec!(1600))
        .with_close("MELI", date(2024, 5, 2), dec!(1800))
        .with_close("AAPL", date(2024, 1, 10), dec!(185))
        .with_close("BRK-B", date(2024, 1, 10), dec!(360))
        .with_latest("BRK-B", dec!(400))
}

fn service(provider: MockProvider, settings: PortfolioSettings) -> PortfolioService {
    PortfolioService::new(
        Arc::new(MemoryLedger { records: ledger() }),
        Arc::new(provider),
        settings,
    )
    .unwrap()
}

#[tokio::test]
async fn test_end_to_end_report() {
    let report = service(provider(), PortfolioSettings::default())
        .build_report()
        .await
        .unwrap();

    let ids: Vec<&str> = report.holdings.iter().map(|h| h.security_id.as_str()).collect();
    assert_eq!(ids, vec!["AAPL", "BRK.B", "KO"]);

    let ko = &report.holdings[2];
    let valuation = ko.valuation.as_ref().unwrap();
    assert_eq!(valuation.market_value_usd, dec!(840));
    assert_eq!(valuation.unrealized_gain_usd.round_dp(2), dec!(200));
    assert_eq!(valuation.return_pct.unwrap().round_dp(2), dec!(31.25));

    let brk = &report.holdings[1];
    assert_eq!(brk.oracle_symbol, "BRK-B");
    assert_eq!(brk.valuation.as_ref().unwrap().market_value_usd, dec!(400));

    let aapl = &report.holdings[0];
    assert_eq!(aapl.price_status, PriceStatus::Unavailable);
    assert_eq!(report.totals.unpriced_count, 1);
    assert_eq!(report.totals.priced_count, 2);
    assert_eq!(report.totals.market_value_usd, dec!(1240));

    assert_eq!(report.closed_currency, ReportCurrency::Local);
    assert_eq!(report.closed_positions.len(), 1);
    let meli = &report.closed_positions[0];
    assert_eq!(meli.security_id, "MELI");
    assert_eq!(meli.realized_gain, dec!(300));
    assert_eq!(meli.return_pct, Some(dec!(30)));
    assert_eq!(report.realized_gain_total, dec!(300));

    let rejected_rows: Vec<usize> = report.rejected.iter().map(|r| r.row).collect();
    assert_eq!(rejected_rows, vec![8, 10]);
    assert!(report.unreconciled.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_report_on_single_worker_runtime() {
    let service = Arc::new(service(provider(), PortfolioSettings::default()));
    let background = tokio::spawn({
        let service = service.clone();
        async move { service.build_report().await }
    });

    let report = background.await.unwrap().unwrap();
    assert_eq!(report.holdings.len(), 3);
    assert_eq!(report.closed_positions.len(), 1);
}

#[tokio::test]
async fn test_usd_closed_positions() {
    let settings = PortfolioSettings {
        closed_position_currency: ReportCurrency::Usd,
        ..Default::default()
    };
    let report = service(provider(), settings).build_report().await.unwrap();

    let meli = &report.closed_positions[0];
    assert_eq!(meli.currency, ReportCurrency::Usd);
    assert_eq!(meli.total_bought, dec!(4600));
    assert_eq!(meli.total_sold, dec!(5400));
    assert_eq!(meli.realized_gain, dec!(800));
}

#[tokio::test]
async fn test_usd_closed_position_without_prices_is_reported() {
    let settings = PortfolioSettings {
        closed_position_currency: ReportCurrency::Usd,
        ..Default::default()
    };
    let provider = MockProvider::new()
        .with_close("KO", date(2024, 1, 10), dec!(50))
        .with_close("KO", date(2024, 2, 12), dec!(60))
        .with_close("MELI", date(2024, 1, 10), dec!(1500))
        .with_close("MELI", date(2024, 2, 1), dec!(1600))
        .with_latest("KO", dec!(70));

    let report = service(provider, settings).build_report().await.unwrap();

    assert!(report.closed_positions.is_empty());
    assert_eq!(report.unreconciled.len(), 1);
    assert_eq!(report.unreconciled[0].security_id, "MELI");
    assert_eq!(report.realized_gain_total, dec!(0));
    // Open positions are unaffected.
    assert_eq!(
        report
            .holdings
            .iter()
            .filter(|h| h.price_status == PriceStatus::Priced)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_unreachable_ledger_aborts() {
    let settings = PortfolioSettings {
        ledger_table: "Otra".to_string(),
        ..Default::default()
    };
    let err = service(provider(), settings).build_report().await.unwrap_err();
    assert!(matches!(err, Error::DataSourceUnavailable(_)));
}

#[tokio::test]
async fn test_unreachable_provider_aborts() {
    let err = service(provider().unavailable(), PortfolioSettings::default())
        .build_report()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DataSourceUnavailable(_)));
}

#[tokio::test]
async fn test_report_is_repeatable() {
    let service = service(provider(), PortfolioSettings::default());
    let first = service.build_report().await.unwrap();
    let second = service.build_report().await.unwrap();

    assert_eq!(first.holdings, second.holdings);
    assert_eq!(first.totals, second.totals);
    assert_eq!(first.closed_positions, second.closed_positions);
}

#[test]
fn test_group_by_security_prefers_explicit_oracle_symbol() {
    let service = service(MockProvider::new(), PortfolioSettings::default());
    let base = Transaction {
        row: 1,
        security_id: "BRK.B".to_string(),
        date: date(2024, 1, 10),
        operation: Operation::Buy,
        local_quantity: dec!(20),
        ratio: dec!(20),
        local_amount: dec!(1000),
        description: None,
        oracle_symbol: None,
    };
    let explicit = Transaction {
        row: 2,
        security_id: "GOGL".to_string(),
        oracle_symbol: Some("GOOGL".to_string()),
        ..base.clone()
    };

    let groups = service.group_by_security(vec![explicit, base]);
    assert_eq!(groups[0].security_id, "BRK.B");
    assert_eq!(groups[0].oracle_symbol, "BRK-B");
    assert_eq!(groups[1].oracle_symbol, "GOOGL");
}

#[test]
fn test_report_serializes_camel_case() {
    let report = PortfolioReport {
        generated_at: chrono::Utc::now(),
        holdings: Vec::new(),
        totals: PortfolioTotals::default(),
        closed_positions: Vec::new(),
        closed_currency: ReportCurrency::Usd,
        realized_gain_total: dec!(0),
        rejected: Vec::new(),
        notes: vec![SecurityNote {
            security_id: "KO".to_string(),
            note: FoldNote::LatestPriceFallback {
                row: 1,
                date: date(2024, 1, 10),
                price: dec!(70),
            },
        }],
        unreconciled: Vec::new(),
    };
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["closedCurrency"], json!("USD"));
    assert_eq!(value["notes"][0]["securityId"], json!("KO"));
    assert_eq!(value["notes"][0]["kind"], json!("latestPriceFallback"));
    assert!(value["totals"]["marketValueUsd"].is_number());
}
