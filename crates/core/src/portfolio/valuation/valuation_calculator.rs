use log::{debug, warn};
use rust_decimal::Decimal;

use super::{HoldingValuation, PortfolioTotals, PriceStatus, Valuation};
use crate::errors::CalculatorError;
use crate::portfolio::positions::Position;
use crate::quotes::PriceLookup;

/// `gain / cost * 100`, `None` when `cost` is zero or the ratio overflows.
pub fn return_pct(gain: Decimal, cost: Decimal) -> Option<Decimal> {
    gain.checked_div(cost)?.checked_mul(Decimal::ONE_HUNDRED)
}

/// Marks `position` to `current_price_usd`.
pub fn calculate_valuation(
    position: &Position,
    current_price_usd: Decimal,
) -> Result<Valuation, CalculatorError> {
    let market_value_usd = position
        .net_shares
        .checked_mul(current_price_usd)
        .ok_or_else(|| CalculatorError::Overflow(format!("market value of {}", position.security_id)))?;
    let unrealized_gain_usd = market_value_usd
        .checked_sub(position.cost_basis_usd)
        .ok_or_else(|| CalculatorError::Overflow(format!("unrealized gain of {}", position.security_id)))?;

    Ok(Valuation {
        current_price_usd,
        market_value_usd,
        cost_basis_usd: position.cost_basis_usd,
        unrealized_gain_usd,
        return_pct: return_pct(unrealized_gain_usd, position.cost_basis_usd),
    })
}

/// Adds one priced holding to the running totals, `None` on overflow.
fn accumulate(totals: &PortfolioTotals, valuation: &Valuation, cost_basis_local: Decimal) -> Option<PortfolioTotals> {
    Some(PortfolioTotals {
        market_value_usd: totals.market_value_usd.checked_add(valuation.market_value_usd)?,
        cost_basis_usd: totals.cost_basis_usd.checked_add(valuation.cost_basis_usd)?,
        cost_basis_local: totals.cost_basis_local.checked_add(cost_basis_local)?,
        unrealized_gain_usd: totals.unrealized_gain_usd.checked_add(valuation.unrealized_gain_usd)?,
        priced_count: totals.priced_count + 1,
        ..totals.clone()
    })
}

/// Values every open position at its latest close.
///
/// Positions without a usable price are kept with `PriceStatus::Unavailable`
/// and left out of the totals; they are never valued at zero.
pub fn value_holdings(
    positions: &[Position],
    prices: &dyn PriceLookup,
) -> (Vec<HoldingValuation>, PortfolioTotals) {
    let mut totals = PortfolioTotals::default();

    let mut holdings: Vec<HoldingValuation> = positions
        .iter()
        .map(|position| {
            let valuation = match prices.latest_close(&position.oracle_symbol) {
                Some(price) if price > Decimal::ZERO => {
                    match calculate_valuation(position, price) {
                        Ok(v) => Some(v),
                        Err(err) => {
                            warn!("{} excluded from totals: {}", position.security_id, err);
                            None
                        }
                    }
                }
                _ => {
                    warn!(
                        "No current price for {} ({}); excluded from totals",
                        position.security_id, position.oracle_symbol
                    );
                    None
                }
            };

            let valuation = match valuation {
                Some(v) => match accumulate(&totals, &v, position.cost_basis_local) {
                    Some(next) => {
                        totals = next;
                        Some(v)
                    }
                    None => {
                        warn!("{} excluded from totals: portfolio sum overflows", position.security_id);
                        None
                    }
                },
                None => None,
            };
            if valuation.is_none() {
                totals.unpriced_count += 1;
            }

            HoldingValuation {
                security_id: position.security_id.clone(),
                oracle_symbol: position.oracle_symbol.clone(),
                description: position.description.clone(),
                net_shares: position.net_shares,
                net_local_units: position.net_local_units,
                ratio: position.ratio,
                cost_basis_usd: position.cost_basis_usd,
                cost_basis_local: position.cost_basis_local,
                avg_entry_price_usd: position.avg_entry_price_usd(),
                avg_entry_price_local: position.avg_entry_price_local(),
                implied_avg_fx: position.implied_avg_fx(),
                first_buy_date: position.first_buy_date,
                transaction_count: position.transaction_count,
                price_status: if valuation.is_some() {
                    PriceStatus::Priced
                } else {
                    PriceStatus::Unavailable
                },
                valuation,
                weight_pct: None,
            }
        })
        .collect();

    totals.return_pct = return_pct(totals.unrealized_gain_usd, totals.cost_basis_usd);

    for holding in holdings.iter_mut() {
        holding.weight_pct = holding
            .valuation
            .as_ref()
            .and_then(|v| return_pct(v.market_value_usd, totals.market_value_usd));
    }

    debug!(
        "Valued {} holdings ({} unpriced), market value {}",
        totals.priced_count, totals.unpriced_count, totals.market_value_usd
    );

    (holdings, totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::PriceBook;
    use rust_decimal_macros::dec;

    fn position(security_id: &str, shares: Decimal, cost_usd: Decimal) -> Position {
        let mut position = Position::new(security_id, security_id);
        position.net_shares = shares;
        position.cost_basis_usd = cost_usd;
        position.cost_basis_local = cost_usd * dec!(1000);
        position
    }

    #[test]
    fn test_scenario_x_valuation() {
        let valuation = calculate_valuation(&position("KO", dec!(12), dec!(640)), dec!(70)).unwrap();

        assert_eq!(valuation.market_value_usd, dec!(840));
        assert_eq!(valuation.unrealized_gain_usd, dec!(200));
        assert_eq!(valuation.return_pct.unwrap().round_dp(2), dec!(31.25));
    }

    #[test]
    fn test_zero_cost_has_no_return() {
        let valuation = calculate_valuation(&position("KO", dec!(1), Decimal::ZERO), dec!(70)).unwrap();
        assert_eq!(valuation.return_pct, None);
        assert_eq!(valuation.unrealized_gain_usd, dec!(70));
    }

    #[test]
    fn test_unpriced_holdings_are_excluded_from_totals() {
        let positions = vec![
            position("KO", dec!(12), dec!(640)),
            position("AAPL", dec!(2), dec!(300)),
            position("MSFT", dec!(1), dec!(350)),
        ];
        let prices = PriceBook::new()
            .with_latest("KO", dec!(70))
            .with_latest("AAPL", dec!(180));

        let (holdings, totals) = value_holdings(&positions, &prices);

        assert_eq!(totals.priced_count, 2);
        assert_eq!(totals.unpriced_count, 1);
        assert_eq!(totals.market_value_usd, dec!(1200));
        assert_eq!(totals.cost_basis_usd, dec!(940));
        assert_eq!(totals.cost_basis_local, dec!(940000));
        assert_eq!(totals.unrealized_gain_usd, dec!(260));

        let msft = &holdings[2];
        assert_eq!(msft.price_status, PriceStatus::Unavailable);
        assert!(msft.valuation.is_none());
        assert!(msft.weight_pct.is_none());

        assert_eq!(holdings[0].weight_pct, Some(dec!(70)));
        assert_eq!(holdings[1].weight_pct, Some(dec!(30)));
    }

    #[test]
    fn test_overflowing_market_value_is_unpriced() {
        let positions = vec![
            position("KO", dec!(12), dec!(640)),
            position("BIG", Decimal::MAX, dec!(1)),
        ];
        let prices = PriceBook::new()
            .with_latest("KO", dec!(70))
            .with_latest("BIG", dec!(2));

        let (holdings, totals) = value_holdings(&positions, &prices);

        assert_eq!(holdings[1].price_status, PriceStatus::Unavailable);
        assert_eq!(totals.priced_count, 1);
        assert_eq!(totals.unpriced_count, 1);
        assert_eq!(totals.market_value_usd, dec!(840));
        assert_eq!(holdings[0].weight_pct, Some(dec!(100)));
    }

    #[test]
    fn test_return_pct_out_of_range_is_none() {
        assert_eq!(return_pct(Decimal::MAX, dec!(0.5)), None);
        assert_eq!(return_pct(dec!(200), dec!(640)), Some(dec!(31.25)));
    }

    #[test]
    fn test_empty_portfolio() {
        let (holdings, totals) = value_holdings(&[], &PriceBook::new());
        assert!(holdings.is_empty());
        assert_eq!(totals.return_pct, None);
        assert_eq!(totals.market_value_usd, Decimal::ZERO);
    }
}
