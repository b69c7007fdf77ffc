use async_trait::async_trait;

use super::RawRecord;
use crate::errors::Result;

/// Source of ledger tables (a hosted spreadsheet, a CSV export, ...).
///
/// Implementations return every row of the named table in ledger order.
/// Failing to reach the store is reported as `Error::DataSourceUnavailable`.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn fetch_all(&self, table: &str) -> Result<Vec<RawRecord>>;
}
