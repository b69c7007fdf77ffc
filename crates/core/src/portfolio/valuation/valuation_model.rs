//! Valuation domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Mark-to-market of one open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    pub current_price_usd: Decimal,
    pub market_value_usd: Decimal,
    pub cost_basis_usd: Decimal,
    pub unrealized_gain_usd: Decimal,
    /// `None` when the cost basis is zero.
    pub return_pct: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceStatus {
    Priced,
    Unavailable,
}

/// An open position together with its valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub security_id: String,
    pub oracle_symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub net_shares: Decimal,
    pub net_local_units: Decimal,
    pub ratio: Decimal,
    pub cost_basis_usd: Decimal,
    pub cost_basis_local: Decimal,
    pub avg_entry_price_usd: Decimal,
    pub avg_entry_price_local: Decimal,
    pub implied_avg_fx: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_buy_date: Option<NaiveDate>,
    pub transaction_count: usize,
    pub price_status: PriceStatus,
    /// Absent when `price_status` is `Unavailable`.
    pub valuation: Option<Valuation>,
    /// Share of the total priced market value.
    pub weight_pct: Option<Decimal>,
}

/// Aggregates over the priced holdings only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioTotals {
    pub market_value_usd: Decimal,
    pub cost_basis_usd: Decimal,
    pub cost_basis_local: Decimal,
    pub unrealized_gain_usd: Decimal,
    pub return_pct: Option<Decimal>,
    pub priced_count: usize,
    pub unpriced_count: usize,
}
