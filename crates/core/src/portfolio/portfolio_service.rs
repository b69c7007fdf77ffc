use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use rayon::prelude::*;
use rust_decimal::Decimal;
use tokio::task;

use cedearfolio_market_data::{MarketDataProvider, SymbolNormalizer};

use super::closed::reconcile;
use super::portfolio_model::{PortfolioReport, ReportIssue, SecurityNote};
use super::positions::{FoldOutcome, PositionEngine};
use super::valuation::value_holdings;
use crate::errors::{CalculatorError, Error, Result};
use crate::ledger::{parse_transactions, LedgerSource, Operation, RejectedRecord, Transaction};
use crate::quotes::{HistoryRequest, PriceBook, PriceOracle};
use crate::settings::{PortfolioSettings, ReportCurrency};

#[async_trait]
pub trait PortfolioServiceTrait: Send + Sync {
    /// Reads the ledger, prices it and returns the complete report.
    ///
    /// Either the whole report is produced or an error is returned.
    async fn build_report(&self) -> Result<PortfolioReport>;
}

/// Transactions of one underlying security.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityLedger {
    pub security_id: String,
    pub oracle_symbol: String,
    pub transactions: Vec<Transaction>,
}

pub struct PortfolioService {
    ledger: Arc<dyn LedgerSource>,
    oracle: PriceOracle,
    engine: PositionEngine,
    normalizer: SymbolNormalizer,
    settings: PortfolioSettings,
}

impl PortfolioService {
    pub fn new(
        ledger: Arc<dyn LedgerSource>,
        provider: Arc<dyn MarketDataProvider>,
        settings: PortfolioSettings,
    ) -> Result<Self> {
        let oracle = PriceOracle::new(provider, &settings)?;
        Ok(Self {
            ledger,
            oracle,
            engine: PositionEngine::new(settings.missing_price_policy),
            normalizer: settings.symbol_normalizer(),
            settings,
        })
    }

    pub fn settings(&self) -> &PortfolioSettings {
        &self.settings
    }

    pub fn oracle(&self) -> &PriceOracle {
        &self.oracle
    }

    /// Groups transactions by security.
    ///
    /// The oracle symbol is the first explicit one found in the ledger, or
    /// the normalized security id.
    pub fn group_by_security(&self, transactions: Vec<Transaction>) -> Vec<SecurityLedger> {
        let mut groups: BTreeMap<String, Vec<Transaction>> = BTreeMap::new();
        for tx in transactions {
            groups.entry(tx.security_id.clone()).or_default().push(tx);
        }

        groups
            .into_iter()
            .map(|(security_id, transactions)| {
                let oracle_symbol = transactions
                    .iter()
                    .find_map(|tx| tx.oracle_symbol.clone())
                    .unwrap_or_else(|| self.normalizer.to_oracle_symbol(&security_id));
                SecurityLedger {
                    security_id,
                    oracle_symbol,
                    transactions,
                }
            })
            .collect()
    }

    /// Every price the report needs: buy-date closes (and sell-date closes
    /// for USD reconciliation) plus the latest close of each symbol.
    fn price_requests(&self, ledgers: &[SecurityLedger]) -> (HistoryRequest, BTreeSet<String>) {
        let with_sells = self.settings.closed_position_currency == ReportCurrency::Usd;
        let mut history = HistoryRequest::new();
        let mut latest = BTreeSet::new();

        for ledger in ledgers {
            latest.insert(ledger.oracle_symbol.clone());
            let dates: BTreeSet<_> = ledger
                .transactions
                .iter()
                .filter(|tx| with_sells || tx.operation == Operation::Buy)
                .map(|tx| tx.date)
                .collect();
            if !dates.is_empty() {
                history
                    .entry(ledger.oracle_symbol.clone())
                    .or_default()
                    .extend(dates);
            }
        }

        (history, latest)
    }

    fn assemble(
        &self,
        outcomes: Vec<FoldOutcome>,
        mut rejected: Vec<RejectedRecord>,
        prices: &PriceBook,
    ) -> Result<PortfolioReport> {
        let currency = self.settings.closed_position_currency;
        let policy = self.settings.missing_price_policy;

        let mut positions = Vec::new();
        let mut closed_positions = Vec::new();
        let mut unreconciled = Vec::new();
        let mut notes = Vec::new();

        for outcome in outcomes {
            rejected.extend(outcome.rejected.iter().cloned());
            notes.extend(outcome.notes.iter().cloned().map(|note| SecurityNote {
                security_id: outcome.security_id.clone(),
                note,
            }));

            if let Some(position) = outcome.position() {
                positions.push(position.clone());
                continue;
            }
            if outcome.applied.is_empty() {
                debug!("{} has no applied transactions", outcome.security_id);
                continue;
            }

            match reconcile(
                &outcome.security_id,
                &outcome.oracle_symbol,
                &outcome.applied,
                currency,
                prices,
                policy,
            ) {
                Ok(closed) => closed_positions.push(closed),
                Err(err) => {
                    warn!("Closed position {} not reconciled: {}", outcome.security_id, err);
                    unreconciled.push(ReportIssue {
                        security_id: outcome.security_id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }

        let (holdings, totals) = value_holdings(&positions, prices);
        let realized_gain_total = closed_positions
            .iter()
            .try_fold(Decimal::ZERO, |sum, c| sum.checked_add(c.realized_gain))
            .ok_or_else(|| CalculatorError::Overflow("total realized gain".to_string()))?;
        rejected.sort_by_key(|r| r.row);

        Ok(PortfolioReport {
            generated_at: Utc::now(),
            holdings,
            totals,
            closed_positions,
            closed_currency: currency,
            realized_gain_total,
            rejected,
            notes,
            unreconciled,
        })
    }
}

/// Folds every security in parallel over the shared price snapshot.
fn fold_securities(
    engine: PositionEngine,
    ledgers: &[SecurityLedger],
    prices: &PriceBook,
) -> Vec<FoldOutcome> {
    ledgers
        .par_iter()
        .map(|ledger| {
            engine.fold(
                &ledger.security_id,
                &ledger.oracle_symbol,
                &ledger.transactions,
                prices,
            )
        })
        .collect()
}

#[async_trait]
impl PortfolioServiceTrait for PortfolioService {
    async fn build_report(&self) -> Result<PortfolioReport> {
        let table = &self.settings.ledger_table;
        let records = self.ledger.fetch_all(table).await?;
        let parsed = parse_transactions(&records, &self.settings.columns);
        info!(
            "Loaded {} transactions from '{}' ({} rows rejected)",
            parsed.transactions.len(),
            table,
            parsed.rejected.len()
        );

        let ledgers = self.group_by_security(parsed.transactions);
        let (history, latest) = self.price_requests(&ledgers);
        let prices = self.oracle.build_price_book(&history, &latest).await?;

        let engine = self.engine;
        let (outcomes, prices) = task::spawn_blocking(move || {
            let outcomes = fold_securities(engine, &ledgers, &prices);
            (outcomes, prices)
        })
        .await
        .map_err(|e| Error::Unexpected(format!("Position fold task failed: {}", e)))?;

        let report = self.assemble(outcomes, parsed.rejected, &prices)?;

        info!(
            "Portfolio report: {} open, {} closed, {} unpriced, {} rejected rows, market value {} USD",
            report.holdings.len(),
            report.closed_positions.len(),
            report.totals.unpriced_count,
            report.rejected.len(),
            report.totals.market_value_usd.round_dp(2)
        );
        Ok(report)
    }
}
