use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{CalculatorError, Error, ValidationError};

/// One row of a ledger table as delivered by the data store.
pub type RawRecord = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Buy,
    Sell,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Buy => "BUY",
            Operation::Sell => "SELL",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    /// Accepts English and Spanish spellings in any case, e.g. " compra ", "SELL", "v".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" | "compra" | "c" | "b" => Ok(Operation::Buy),
            "sell" | "venta" | "v" | "s" => Ok(Operation::Sell),
            _ => Err(ValidationError::UnknownOperation(s.trim().to_string())),
        }
    }
}

/// A validated ledger movement.
///
/// Quantities are in local listing units; `ratio` converts them to
/// underlying shares. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// 1-based position of the record in the ledger table
    pub row: usize,
    pub security_id: String,
    pub date: NaiveDate,
    pub operation: Operation,
    pub local_quantity: Decimal,
    pub ratio: Decimal,
    pub local_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Explicit provider ticker of the underlying share, when the ledger has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oracle_symbol: Option<String>,
}

impl Transaction {
    /// Quantity expressed in underlying shares.
    ///
    /// Fails for a zero ratio or a quotient outside the decimal range.
    pub fn underlying_shares(&self) -> Result<Decimal, CalculatorError> {
        self.local_quantity.checked_div(self.ratio).ok_or_else(|| {
            CalculatorError::Overflow(format!(
                "{} units at ratio {} (row {})",
                self.local_quantity, self.ratio, self.row
            ))
        })
    }

    pub fn is_buy(&self) -> bool {
        self.operation == Operation::Buy
    }
}

/// A ledger record that was kept out of the computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRecord {
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub reason: String,
}

impl RejectedRecord {
    pub fn for_transaction(tx: &Transaction, reason: impl Into<String>) -> Self {
        Self {
            row: tx.row,
            security_id: Some(tx.security_id.clone()),
            date: Some(tx.date),
            reason: reason.into(),
        }
    }

    pub fn to_error(&self) -> Error {
        Error::MalformedRecord {
            row: self.row,
            reason: self.reason.clone(),
        }
    }
}

/// Result of the schema step: typed transactions plus quarantined rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLedger {
    pub transactions: Vec<Transaction>,
    pub rejected: Vec<RejectedRecord>,
}
