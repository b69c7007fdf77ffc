use log::debug;
use rust_decimal::Decimal;

use super::ClosedPosition;
use crate::errors::{CalculatorError, Error, Result};
use crate::ledger::{Operation, Transaction};
use crate::portfolio::valuation::return_pct;
use crate::quotes::PriceLookup;
use crate::settings::{MissingPricePolicy, ReportCurrency};

/// Running sums for one reconciliation.
#[derive(Default)]
struct Legs {
    bought: Decimal,
    sold: Decimal,
    buy_count: usize,
    sell_count: usize,
}

impl Legs {
    fn record(&mut self, operation: Operation, amount: Decimal, security_id: &str) -> Result<()> {
        let (total, count) = match operation {
            Operation::Buy => (&mut self.bought, &mut self.buy_count),
            Operation::Sell => (&mut self.sold, &mut self.sell_count),
        };
        *total = total.checked_add(amount).ok_or_else(|| {
            CalculatorError::Overflow(format!("{} total of {}", operation.as_str(), security_id))
        })?;
        *count += 1;
        Ok(())
    }

    fn into_closed(
        self,
        security_id: &str,
        oracle_symbol: &str,
        currency: ReportCurrency,
        transactions: &[Transaction],
    ) -> ClosedPosition {
        let realized_gain = self.sold - self.bought;
        ClosedPosition {
            security_id: security_id.to_string(),
            oracle_symbol: oracle_symbol.to_string(),
            description: transactions.iter().find_map(|tx| tx.description.clone()),
            currency,
            total_bought: self.bought,
            total_sold: self.sold,
            realized_gain,
            return_pct: return_pct(realized_gain, self.bought),
            buy_count: self.buy_count,
            sell_count: self.sell_count,
            last_sell_date: transactions
                .iter()
                .filter(|tx| tx.operation == Operation::Sell)
                .map(|tx| tx.date)
                .max(),
        }
    }
}

/// Sums the local cash of every leg.
pub fn reconcile_local(
    security_id: &str,
    oracle_symbol: &str,
    transactions: &[Transaction],
) -> Result<ClosedPosition> {
    let mut legs = Legs::default();
    for tx in transactions {
        legs.record(tx.operation, tx.local_amount, security_id)?;
    }
    Ok(legs.into_closed(security_id, oracle_symbol, ReportCurrency::Local, transactions))
}

/// Values every leg at the underlying's USD close on its date.
///
/// Buy legs follow the same missing-price policy as the position engine.
/// A leg without any price fails the whole security with
/// `Error::PriceUnavailable`.
pub fn reconcile_usd(
    security_id: &str,
    oracle_symbol: &str,
    transactions: &[Transaction],
    prices: &dyn PriceLookup,
    policy: MissingPricePolicy,
) -> Result<ClosedPosition> {
    let mut legs = Legs::default();
    for tx in transactions {
        let close = prices.historical_close(oracle_symbol, tx.date);
        let price = match (tx.operation, close, policy) {
            (_, Some(price), _) => price,
            (Operation::Buy, None, MissingPricePolicy::UseLatest) => prices
                .latest_close(oracle_symbol)
                .ok_or_else(|| Error::price_unavailable(oracle_symbol, Some(tx.date)))?,
            _ => return Err(Error::price_unavailable(oracle_symbol, Some(tx.date))),
        };

        let amount = tx.underlying_shares()?.checked_mul(price).ok_or_else(|| {
            CalculatorError::Overflow(format!("USD value of row {}", tx.row))
        })?;
        legs.record(tx.operation, amount, security_id)?;
    }
    Ok(legs.into_closed(security_id, oracle_symbol, ReportCurrency::Usd, transactions))
}

/// Reconciles a closed security in the requested currency.
pub fn reconcile(
    security_id: &str,
    oracle_symbol: &str,
    transactions: &[Transaction],
    currency: ReportCurrency,
    prices: &dyn PriceLookup,
    policy: MissingPricePolicy,
) -> Result<ClosedPosition> {
    debug!("Reconciling closed position {} in {:?}", security_id, currency);
    match currency {
        ReportCurrency::Local => reconcile_local(security_id, oracle_symbol, transactions),
        ReportCurrency::Usd => reconcile_usd(security_id, oracle_symbol, transactions, prices, policy),
    }
}
