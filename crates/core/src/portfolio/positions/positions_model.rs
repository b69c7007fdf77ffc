use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::is_quantity_significant;
use crate::errors::CalculatorError;
use crate::ledger::{RejectedRecord, Transaction};

fn overflow(what: &str, security_id: &str) -> CalculatorError {
    CalculatorError::Overflow(format!("{} of {}", what, security_id))
}

/// An open holding of one underlying security.
///
/// Share counts are in underlying shares; `net_local_units` tracks the
/// depositary-receipt units still held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub security_id: String,
    pub oracle_symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub net_shares: Decimal,
    pub net_local_units: Decimal,
    /// Ratio of the most recent movement.
    pub ratio: Decimal,
    pub cost_basis_usd: Decimal,
    pub cost_basis_local: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_buy_date: Option<NaiveDate>,
    pub transaction_count: usize,
}

impl Position {
    pub fn new(security_id: impl Into<String>, oracle_symbol: impl Into<String>) -> Self {
        Self {
            security_id: security_id.into(),
            oracle_symbol: oracle_symbol.into(),
            description: None,
            net_shares: Decimal::ZERO,
            net_local_units: Decimal::ZERO,
            ratio: Decimal::ZERO,
            cost_basis_usd: Decimal::ZERO,
            cost_basis_local: Decimal::ZERO,
            first_buy_date: None,
            transaction_count: 0,
        }
    }

    /// Average USD cost per underlying share.
    ///
    /// Zero when nothing is held or the quotient is not representable.
    pub fn avg_entry_price_usd(&self) -> Decimal {
        self.cost_basis_usd
            .checked_div(self.net_shares)
            .unwrap_or(Decimal::ZERO)
    }

    /// Average local cost per underlying share, with the same zero rule.
    pub fn avg_entry_price_local(&self) -> Decimal {
        self.cost_basis_local
            .checked_div(self.net_shares)
            .unwrap_or(Decimal::ZERO)
    }

    /// Local currency paid per USD of cost basis.
    pub fn implied_avg_fx(&self) -> Option<Decimal> {
        self.cost_basis_local.checked_div(self.cost_basis_usd)
    }

    pub fn is_open(&self) -> bool {
        is_quantity_significant(&self.net_shares)
    }

    /// Applies a purchase of `shares` underlying shares at `price_usd`.
    ///
    /// The position is left untouched when any sum overflows.
    pub fn add_shares(
        &mut self,
        tx: &Transaction,
        shares: Decimal,
        price_usd: Decimal,
    ) -> Result<(), CalculatorError> {
        let id = self.security_id.as_str();
        let net_shares = self
            .net_shares
            .checked_add(shares)
            .ok_or_else(|| overflow("share count", id))?;
        let net_local_units = self
            .net_local_units
            .checked_add(tx.local_quantity)
            .ok_or_else(|| overflow("local units", id))?;
        let cost_basis_usd = shares
            .checked_mul(price_usd)
            .and_then(|cost| self.cost_basis_usd.checked_add(cost))
            .ok_or_else(|| overflow("USD cost basis", id))?;
        let cost_basis_local = self
            .cost_basis_local
            .checked_add(tx.local_amount)
            .ok_or_else(|| overflow("local cost basis", id))?;

        self.net_shares = net_shares;
        self.net_local_units = net_local_units;
        self.cost_basis_usd = cost_basis_usd;
        self.cost_basis_local = cost_basis_local;
        self.first_buy_date.get_or_insert(tx.date);
        Ok(())
    }

    /// Removes `shares` keeping both average prices unchanged.
    ///
    /// Returns the number of shares actually removed, which is capped at the
    /// current holding. A holding left below the quantity threshold is reset
    /// to zero. The position is left untouched when an average overflows.
    pub fn reduce_proportionally(&mut self, shares: Decimal) -> Result<Decimal, CalculatorError> {
        let held = self.net_shares;
        if held <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let removed = shares.min(held);
        let id = self.security_id.as_str();

        let mut remaining = held - removed;
        if !is_quantity_significant(&remaining) {
            remaining = Decimal::ZERO;
        }
        // remaining <= held, so scaling each total by remaining / held stays in range.
        let scale = |total: Decimal, what: &str| {
            total
                .checked_div(held)
                .and_then(|per_share| per_share.checked_mul(remaining))
                .ok_or_else(|| overflow(what, id))
        };
        let cost_basis_usd = scale(self.cost_basis_usd, "USD average cost")?;
        let cost_basis_local = scale(self.cost_basis_local, "local average cost")?;
        let net_local_units = scale(self.net_local_units, "local units")?;

        self.net_shares = remaining;
        self.cost_basis_usd = cost_basis_usd;
        self.cost_basis_local = cost_basis_local;
        self.net_local_units = net_local_units;

        Ok(removed)
    }
}

/// Something noteworthy that happened while folding a security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FoldNote {
    /// A BUY had no historical close and was costed at the latest close.
    #[serde(rename_all = "camelCase")]
    LatestPriceFallback {
        row: usize,
        date: NaiveDate,
        price: Decimal,
    },
    /// A SELL exceeded the holding and was capped at the shares held.
    #[serde(rename_all = "camelCase")]
    SaleClamped {
        row: usize,
        date: NaiveDate,
        requested_shares: Decimal,
        held_shares: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionStatus {
    Open(Position),
    Closed,
}

/// Result of folding one security's transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutcome {
    pub security_id: String,
    pub oracle_symbol: String,
    pub status: PositionStatus,
    pub notes: Vec<FoldNote>,
    pub rejected: Vec<RejectedRecord>,
    /// Transactions that took part in the fold, in fold order.
    pub applied: Vec<Transaction>,
}

impl FoldOutcome {
    pub fn position(&self) -> Option<&Position> {
        match &self.status {
            PositionStatus::Open(position) => Some(position),
            PositionStatus::Closed => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.status, PositionStatus::Closed)
    }
}
