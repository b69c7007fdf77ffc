//! CSV-backed ledger sources.
//!
//! Hosted spreadsheets publish each sheet as a CSV export, so both the local
//! and the remote source share the same CSV-to-record conversion.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use csv::{ReaderBuilder, Trim};
use log::{debug, info};
use reqwest::StatusCode;
use serde_json::Value;

use super::{LedgerSource, RawRecord};
use crate::errors::{Error, Result};

/// Placeholder replaced by the (URL-encoded) table name in remote URL templates.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Reads CSV content into raw records, one per data row.
///
/// Header names are trimmed; empty cells become `null`.
pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for result in csv_reader.records() {
        let row = result?;
        let record: RawRecord = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| !header.is_empty())
            .map(|(i, header)| {
                let value = match row.get(i) {
                    Some(cell) if !cell.is_empty() => Value::String(cell.to_string()),
                    _ => Value::Null,
                };
                (header.clone(), value)
            })
            .collect();
        records.push(record);
    }

    Ok(records)
}

/// Ledger tables stored as `<dir>/<table>.csv`.
#[derive(Debug, Clone)]
pub struct CsvLedgerSource {
    dir: PathBuf,
}

impl CsvLedgerSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", table))
    }
}

#[async_trait]
impl LedgerSource for CsvLedgerSource {
    async fn fetch_all(&self, table: &str) -> Result<Vec<RawRecord>> {
        let path = self.table_path(table);
        debug!("Reading ledger table '{}' from {}", table, path.display());

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            Error::DataSourceUnavailable(format!("Cannot read {}: {}", path.display(), e))
        })?;

        records_from_csv(bytes.as_slice())
    }
}

/// Ledger tables published by a hosted spreadsheet as CSV over HTTPS.
///
/// `url_template` must contain [`TABLE_PLACEHOLDER`], e.g.
/// `https://docs.google.com/spreadsheets/d/<id>/gviz/tq?tqx=out:csv&sheet={table}`.
pub struct HttpCsvLedgerSource {
    client: reqwest::Client,
    url_template: String,
    token: Option<String>,
}

impl HttpCsvLedgerSource {
    pub fn new(
        url_template: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let url_template = url_template.into();
        if !url_template.contains(TABLE_PLACEHOLDER) {
            return Err(Error::InvalidConfigValue(format!(
                "ledger URL template must contain {}",
                TABLE_PLACEHOLDER
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::DataSourceUnavailable(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url_template,
            token,
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        self.url_template
            .replace(TABLE_PLACEHOLDER, &urlencoding::encode(table))
    }
}

#[async_trait]
impl LedgerSource for HttpCsvLedgerSource {
    async fn fetch_all(&self, table: &str) -> Result<Vec<RawRecord>> {
        let url = self.table_url(table);
        info!("Fetching ledger table '{}'", table);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::DataSourceUnavailable(format!("Ledger request failed: {}", e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(Error::DataSourceUnavailable(
                    "Ledger store rejected the credentials".to_string(),
                ));
            }
            status if !status.is_success() => {
                return Err(Error::DataSourceUnavailable(format!(
                    "Ledger store returned HTTP {} for table '{}'",
                    status, table
                )));
            }
            _ => {}
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::DataSourceUnavailable(format!("Ledger body unreadable: {}", e)))?;

        records_from_csv(body.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_records_from_csv_trims_headers_and_nulls_empty_cells() {
        let csv = " Ticker , Fecha ,Cantidad\nKO,2024-01-10,100\nAAPL,,5\n";
        let records = records_from_csv(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Ticker"], Value::String("KO".to_string()));
        assert_eq!(records[1]["Fecha"], Value::Null);
        assert_eq!(records[1]["Cantidad"], Value::String("5".to_string()));
    }

    #[test]
    fn test_records_from_csv_handles_short_rows() {
        let csv = "Ticker,Fecha,Cantidad\nKO\n";
        let records = records_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(records[0]["Cantidad"], Value::Null);
    }

    #[tokio::test]
    async fn test_csv_source_reads_table_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("Movimientos.csv")).unwrap();
        writeln!(file, "Ticker,Fecha,Operacion,Cantidad,Ratio,Monto").unwrap();
        writeln!(file, "KO,2024-01-10,Compra,50,5,60000").unwrap();

        let source = CsvLedgerSource::new(dir.path());
        let records = source.fetch_all("Movimientos").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["Operacion"], Value::String("Compra".to_string()));
    }

    #[tokio::test]
    async fn test_missing_table_is_data_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvLedgerSource::new(dir.path());
        let err = source.fetch_all("Nope").await.unwrap_err();
        assert!(matches!(err, Error::DataSourceUnavailable(_)));
    }

    #[test]
    fn test_http_source_requires_placeholder() {
        let result = HttpCsvLedgerSource::new(
            "https://example.com/export.csv",
            None,
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(Error::InvalidConfigValue(_))));
    }

    #[test]
    fn test_http_source_encodes_table_name() {
        let source = HttpCsvLedgerSource::new(
            "https://example.com/export?sheet={table}",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            source.table_url("Mis Movimientos"),
            "https://example.com/export?sheet=Mis%20Movimientos"
        );
    }
}
