use log::{debug, warn};

use super::{FoldNote, FoldOutcome, Position, PositionStatus};
use crate::constants::is_quantity_significant;
use crate::errors::CalculatorError;
use crate::ledger::{Operation, RejectedRecord, Transaction};
use crate::quotes::PriceLookup;
use crate::settings::MissingPricePolicy;

/// Folds a security's ledger into its current position.
///
/// Purchases are costed in USD at the historical close of the underlying
/// share; sales remove shares at the running average so that the average
/// entry price never moves on a sale.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionEngine {
    policy: MissingPricePolicy,
}

impl PositionEngine {
    pub fn new(policy: MissingPricePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingPricePolicy {
        self.policy
    }

    /// Folds `transactions` (all belonging to `security_id`) in date order.
    ///
    /// Ties on the same date keep ledger row order. The input slice is not
    /// modified.
    pub fn fold(
        &self,
        security_id: &str,
        oracle_symbol: &str,
        transactions: &[Transaction],
        prices: &dyn PriceLookup,
    ) -> FoldOutcome {
        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by_key(|tx| (tx.date, tx.row));

        let mut position = Position::new(security_id, oracle_symbol);
        let mut notes = Vec::new();
        let mut rejected = Vec::new();
        let mut applied = Vec::with_capacity(ordered.len());

        for tx in ordered {
            let result = match tx.operation {
                Operation::Buy => self.apply_buy(&mut position, tx, oracle_symbol, prices),
                Operation::Sell => apply_sell(&mut position, tx),
            };

            match result {
                Ok(note) => {
                    notes.extend(note);
                    position.ratio = tx.ratio;
                    position.transaction_count += 1;
                    if position.description.is_none() {
                        position.description = tx.description.clone();
                    }
                    applied.push(tx.clone());
                }
                Err(err) => {
                    let record = RejectedRecord::for_transaction(tx, err.to_string());
                    warn!("{}: {}", security_id, record.to_error());
                    rejected.push(record);
                }
            }
        }

        let status = if is_quantity_significant(&position.net_shares) {
            PositionStatus::Open(position)
        } else {
            PositionStatus::Closed
        };

        debug!(
            "Folded {}: {} applied, {} rejected, open = {}",
            security_id,
            applied.len(),
            rejected.len(),
            matches!(status, PositionStatus::Open(_))
        );

        FoldOutcome {
            security_id: security_id.to_string(),
            oracle_symbol: oracle_symbol.to_string(),
            status,
            notes,
            rejected,
            applied,
        }
    }

    fn apply_buy(
        &self,
        position: &mut Position,
        tx: &Transaction,
        oracle_symbol: &str,
        prices: &dyn PriceLookup,
    ) -> Result<Option<FoldNote>, CalculatorError> {
        let shares = tx.underlying_shares()?;

        let (price, note) = match prices.historical_close(oracle_symbol, tx.date) {
            Some(price) => (price, None),
            None => {
                let fallback = match self.policy {
                    MissingPricePolicy::UseLatest => prices.latest_close(oracle_symbol),
                    MissingPricePolicy::Exclude => None,
                };
                match fallback {
                    Some(price) => (
                        price,
                        Some(FoldNote::LatestPriceFallback {
                            row: tx.row,
                            date: tx.date,
                            price,
                        }),
                    ),
                    None => {
                        return Err(CalculatorError::MissingHistoricalPrice {
                            symbol: oracle_symbol.to_string(),
                            date: tx.date,
                        })
                    }
                }
            }
        };

        position.add_shares(tx, shares, price)?;
        Ok(note)
    }
}

fn apply_sell(position: &mut Position, tx: &Transaction) -> Result<Option<FoldNote>, CalculatorError> {
    let requested = tx.underlying_shares()?;

    if !is_quantity_significant(&position.net_shares) {
        return Err(CalculatorError::OversoldPosition {
            security_id: tx.security_id.clone(),
            date: tx.date,
            requested,
        });
    }

    let held = position.net_shares;
    let note = if requested > held {
        warn!(
            "Sell of {} shares of {} on {} exceeds the {} held. Reducing by the held amount.",
            requested, tx.security_id, tx.date, held
        );
        Some(FoldNote::SaleClamped {
            row: tx.row,
            date: tx.date,
            requested_shares: requested,
            held_shares: held,
        })
    } else {
        None
    };

    position.reduce_proportionally(requested)?;
    Ok(note)
}

