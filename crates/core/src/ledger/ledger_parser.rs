//! Schema step at the ledger boundary.
//!
//! Converts loosely typed spreadsheet rows into [`Transaction`]s. Rows that
//! cannot be trusted are quarantined as [`RejectedRecord`]s; a bad row never
//! stops the rest of the ledger from being read.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::Value;

use super::{Operation, ParsedLedger, RawRecord, RejectedRecord, Transaction};
use crate::constants::SPREADSHEET_EPOCH;
use crate::errors::ValidationError;
use crate::settings::LedgerColumns;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Parses every record of a ledger table.
pub fn parse_transactions(records: &[RawRecord], columns: &LedgerColumns) -> ParsedLedger {
    let mut parsed = ParsedLedger::default();

    for (index, record) in records.iter().enumerate() {
        let row = index + 1;
        let fields = RecordFields::new(record);

        if fields.is_blank() {
            debug!("Skipping blank ledger row {}", row);
            continue;
        }

        match parse_record(row, &fields, columns) {
            Ok(tx) => parsed.transactions.push(tx),
            Err(err) => {
                let rejected = RejectedRecord {
                    row,
                    security_id: fields.text(&columns.security).map(|s| s.to_uppercase()),
                    date: fields
                        .get(&columns.date)
                        .and_then(|v| parse_date_value(v).ok()),
                    reason: err.to_string(),
                };
                warn!("{}", rejected.to_error());
                parsed.rejected.push(rejected);
            }
        }
    }

    debug!(
        "Parsed {} ledger transactions ({} rejected)",
        parsed.transactions.len(),
        parsed.rejected.len()
    );
    parsed
}

fn parse_record(
    row: usize,
    fields: &RecordFields<'_>,
    columns: &LedgerColumns,
) -> Result<Transaction, ValidationError> {
    let security_id = fields
        .text(&columns.security)
        .ok_or_else(|| ValidationError::MissingField(columns.security.clone()))?
        .to_uppercase();

    let date = parse_date_value(fields.required(&columns.date)?)?;

    let operation_text = fields
        .text(&columns.operation)
        .ok_or_else(|| ValidationError::MissingField(columns.operation.clone()))?;
    let operation = Operation::from_str(&operation_text)?;

    let local_quantity = parse_decimal_value(fields.required(&columns.quantity)?)?;
    if local_quantity <= Decimal::ZERO {
        return Err(ValidationError::InvalidInput(format!(
            "quantity must be positive, got {}",
            local_quantity
        )));
    }

    let ratio = parse_decimal_value(fields.required(&columns.ratio)?)?;
    if ratio <= Decimal::ZERO {
        return Err(ValidationError::InvalidInput(format!(
            "ratio must be positive, got {}",
            ratio
        )));
    }

    if local_quantity.checked_div(ratio).is_none() {
        return Err(ValidationError::InvalidInput(format!(
            "quantity {} at ratio {} is out of range",
            local_quantity, ratio
        )));
    }

    // Cash sign conventions differ between sheets; the operation gives the direction.
    let local_amount = parse_decimal_value(fields.required(&columns.amount)?)?.abs();

    Ok(Transaction {
        row,
        security_id,
        date,
        operation,
        local_quantity,
        ratio,
        local_amount,
        description: fields.text(&columns.description),
        oracle_symbol: fields.text(&columns.oracle_symbol).map(|s| s.to_uppercase()),
    })
}

/// Record view keyed by normalized column name.
struct RecordFields<'a> {
    values: HashMap<String, &'a Value>,
}

impl<'a> RecordFields<'a> {
    fn new(record: &'a RawRecord) -> Self {
        let values = record
            .iter()
            .map(|(key, value)| (normalize_header(key), value))
            .collect();
        Self { values }
    }

    fn is_blank(&self) -> bool {
        self.values.values().all(|v| is_blank(v))
    }

    fn get(&self, column: &str) -> Option<&'a Value> {
        self.values
            .get(&normalize_header(column))
            .copied()
            .filter(|v| !is_blank(v))
    }

    fn required(&self, column: &str) -> Result<&'a Value, ValidationError> {
        self.get(column)
            .ok_or_else(|| ValidationError::MissingField(column.to_string()))
    }

    fn text(&self, column: &str) -> Option<String> {
        self.get(column).and_then(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Trims, lowercases and strips Spanish accents from a column name.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Parses a numeric cell.
///
/// Strings may carry a `$` sign, spaces, thousands separators and a decimal
/// comma. A single separator is read as the decimal mark (`12,5` and `12.5`
/// are both twelve and a half); repeated separators are thousands marks.
pub fn parse_decimal_value(value: &Value) -> Result<Decimal, ValidationError> {
    match value {
        Value::Number(n) => parse_plain_decimal(&n.to_string()),
        Value::String(s) => parse_decimal_str(s),
        other => Err(ValidationError::DecimalParse(other.to_string())),
    }
}

pub fn parse_decimal_str(raw: &str) -> Result<Decimal, ValidationError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != '\u{a0}')
        .collect();

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // 1.234,56
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        // 1,234.56
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        (None, Some(_)) if cleaned.matches('.').count() > 1 => cleaned.replace('.', ""),
        _ => cleaned,
    };

    parse_plain_decimal(&normalized).map_err(|_| ValidationError::DecimalParse(raw.to_string()))
}

fn parse_plain_decimal(s: &str) -> Result<Decimal, ValidationError> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|_| ValidationError::DecimalParse(s.to_string()))
}

/// Parses a date cell: ISO or day-first strings, or a spreadsheet serial number.
pub fn parse_date_value(value: &Value) -> Result<NaiveDate, ValidationError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(serial_to_date)
            .ok_or_else(|| ValidationError::DateParse(n.to_string())),
        Value::String(s) => parse_date_str(s),
        other => Err(ValidationError::DateParse(other.to_string())),
    }
}

pub fn parse_date_str(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    // Drop a time component ("2024-01-10 00:00:00", "2024-01-10T00:00:00Z").
    let date_part = trimmed
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()
        .unwrap_or(trimmed);

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
    {
        return Ok(date);
    }

    if date_part.chars().all(|c| c.is_ascii_digit()) {
        if let Some(date) = date_part.parse::<f64>().ok().and_then(serial_to_date) {
            return Ok(date);
        }
    }

    Err(ValidationError::DateParse(raw.to_string()))
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=200_000.0).contains(&serial) {
        return None;
    }
    let (y, m, d) = SPREADSHEET_EPOCH;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}
