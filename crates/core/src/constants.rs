use rust_decimal::Decimal;

/// Quantity threshold (underlying shares) below which a position is considered closed
pub const QUANTITY_THRESHOLD: &str = "0.0001";

/// Calendar days searched after a transaction date for the first available close
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 5;

/// Smallest look-ahead window that still spans a long weekend
pub const MIN_LOOKAHEAD_DAYS: u32 = 4;

/// Time-to-live for cached quotes
pub const DEFAULT_QUOTE_TTL_SECS: u64 = 3600;

/// Upper bound for a single price provider call
pub const DEFAULT_ORACLE_TIMEOUT_MS: u64 = 10_000;

/// Concurrent price provider requests
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Name of the movement ledger table
pub const DEFAULT_LEDGER_TABLE: &str = "Movimientos";

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Spreadsheet serial dates count days from this epoch
pub const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

pub fn quantity_threshold() -> Decimal {
    Decimal::from_str_radix(QUANTITY_THRESHOLD, 10).unwrap_or_else(|_| Decimal::new(1, 4))
}

/// True when `quantity` is above the open-position threshold.
pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    *quantity > quantity_threshold()
}
