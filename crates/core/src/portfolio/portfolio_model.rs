use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::closed::ClosedPosition;
use super::positions::FoldNote;
use super::valuation::{HoldingValuation, PortfolioTotals};
use crate::ledger::RejectedRecord;
use crate::settings::ReportCurrency;

/// A fold note tagged with the security it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityNote {
    pub security_id: String,
    #[serde(flatten)]
    pub note: FoldNote,
}

/// A security whose figures could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssue {
    pub security_id: String,
    pub message: String,
}

/// Complete output of one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioReport {
    pub generated_at: DateTime<Utc>,
    pub holdings: Vec<HoldingValuation>,
    pub totals: PortfolioTotals,
    pub closed_positions: Vec<ClosedPosition>,
    pub closed_currency: ReportCurrency,
    pub realized_gain_total: Decimal,
    /// Ledger rows kept out of the computation, by row.
    pub rejected: Vec<RejectedRecord>,
    pub notes: Vec<SecurityNote>,
    /// Closed securities that could not be reconciled.
    pub unreconciled: Vec<ReportIssue>,
}
