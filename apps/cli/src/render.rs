use std::fmt::Write;

use rust_decimal::Decimal;

use cedearfolio_core::constants::DISPLAY_DECIMAL_PRECISION;
use cedearfolio_core::portfolio::{FoldNote, PortfolioReport};
use cedearfolio_core::settings::ReportCurrency;

pub fn to_json(report: &PortfolioReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn amount(value: Decimal) -> String {
    value.round_dp(DISPLAY_DECIMAL_PRECISION).to_string()
}

fn pct(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format!("{}%", v.round_dp(DISPLAY_DECIMAL_PRECISION)),
        None => "-".to_string(),
    }
}

/// Plain-text tables for a terminal.
pub fn to_text(report: &PortfolioReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Open positions");
    let _ = writeln!(
        out,
        "{:<10} {:<8} {:>12} {:>12} {:>14} {:>10} {:>14} {:>14} {:>10} {:>8}",
        "Security", "Oracle", "Units", "Shares", "Cost USD", "Avg USD", "Value USD", "Gain USD", "Return", "Weight"
    );
    for holding in &report.holdings {
        let (value, gain, ret) = match &holding.valuation {
            Some(v) => (amount(v.market_value_usd), amount(v.unrealized_gain_usd), pct(v.return_pct)),
            None => ("n/a".to_string(), "n/a".to_string(), "-".to_string()),
        };
        let _ = writeln!(
            out,
            "{:<10} {:<8} {:>12} {:>12} {:>14} {:>10} {:>14} {:>14} {:>10} {:>8}",
            holding.security_id,
            holding.oracle_symbol,
            holding.net_local_units.normalize(),
            holding.net_shares.round_dp(4).normalize(),
            amount(holding.cost_basis_usd),
            amount(holding.avg_entry_price_usd),
            value,
            gain,
            ret,
            pct(holding.weight_pct),
        );
    }

    let totals = &report.totals;
    let _ = writeln!(
        out,
        "Total market value {} USD, cost {} USD, unrealized {} USD ({}), {} priced, {} without price",
        amount(totals.market_value_usd),
        amount(totals.cost_basis_usd),
        amount(totals.unrealized_gain_usd),
        pct(totals.return_pct),
        totals.priced_count,
        totals.unpriced_count
    );

    let unit = match report.closed_currency {
        ReportCurrency::Local => "local",
        ReportCurrency::Usd => "USD",
    };
    let _ = writeln!(out);
    let _ = writeln!(out, "Closed positions ({})", unit);
    let _ = writeln!(
        out,
        "{:<10} {:>14} {:>14} {:>14} {:>10} {:>12}",
        "Security", "Bought", "Sold", "Realized", "Return", "Last sale"
    );
    for closed in &report.closed_positions {
        let _ = writeln!(
            out,
            "{:<10} {:>14} {:>14} {:>14} {:>10} {:>12}",
            closed.security_id,
            amount(closed.total_bought),
            amount(closed.total_sold),
            amount(closed.realized_gain),
            pct(closed.return_pct),
            closed
                .last_sell_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    let _ = writeln!(out, "Total realized {} ({})", amount(report.realized_gain_total), unit);

    for issue in &report.unreconciled {
        let _ = writeln!(out, "  {} not reconciled: {}", issue.security_id, issue.message);
    }

    if !report.notes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Notes");
        for entry in &report.notes {
            let line = match &entry.note {
                FoldNote::LatestPriceFallback { row, date, price } => format!(
                    "row {}: no close on or after {}, costed at latest close {}",
                    row, date, price
                ),
                FoldNote::SaleClamped {
                    row,
                    date,
                    requested_shares,
                    held_shares,
                } => format!(
                    "row {}: sale of {} shares on {} capped at {} held",
                    row, requested_shares, date, held_shares
                ),
            };
            let _ = writeln!(out, "  {} {}", entry.security_id, line);
        }
    }

    if !report.rejected.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Rejected rows");
        for rejected in &report.rejected {
            let _ = writeln!(
                out,
                "  row {} {}: {}",
                rejected.row,
                rejected.security_id.as_deref().unwrap_or("?"),
                rejected.reason
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedearfolio_core::ledger::RejectedRecord;
    use cedearfolio_core::portfolio::{ClosedPosition, PortfolioTotals};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn report() -> PortfolioReport {
        PortfolioReport {
            generated_at: Utc::now(),
            holdings: Vec::new(),
            totals: PortfolioTotals::default(),
            closed_positions: vec![ClosedPosition {
                security_id: "MELI".to_string(),
                oracle_symbol: "MELI".to_string(),
                description: None,
                currency: ReportCurrency::Local,
                total_bought: dec!(1000),
                total_sold: dec!(1300),
                realized_gain: dec!(300),
                return_pct: Some(dec!(30)),
                buy_count: 2,
                sell_count: 1,
                last_sell_date: None,
            }],
            closed_currency: ReportCurrency::Local,
            realized_gain_total: dec!(300),
            rejected: vec![RejectedRecord {
                row: 8,
                security_id: Some("KO".to_string()),
                date: None,
                reason: "Unknown operation 'Dividendo'".to_string(),
            }],
            notes: Vec::new(),
            unreconciled: Vec::new(),
        }
    }

    #[test]
    fn test_text_lists_closed_and_rejected() {
        let text = to_text(&report());
        assert!(text.contains("MELI"));
        assert!(text.contains("30%"));
        assert!(text.contains("row 8 KO"));
    }

    #[test]
    fn test_json_is_camel_case() {
        let json = to_json(&report()).unwrap();
        assert!(json.contains("\"closedPositions\""));
        assert!(json.contains("\"realizedGainTotal\""));
    }
}
