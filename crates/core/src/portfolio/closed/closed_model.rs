use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::settings::ReportCurrency;

/// Realized result of a security that is no longer held.
///
/// All amounts are in `currency`; a report never mixes units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedPosition {
    pub security_id: String,
    pub oracle_symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub currency: ReportCurrency,
    pub total_bought: Decimal,
    pub total_sold: Decimal,
    pub realized_gain: Decimal,
    /// `None` when nothing was bought.
    pub return_pct: Option<Decimal>,
    pub buy_count: usize,
    pub sell_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sell_date: Option<NaiveDate>,
}
