//! Valuation and invariant checking helpers

use crate::math::*;
use crate::sources::Prices;
use crate::state::*;

/// Collateral value in reference currency
pub fn collateral_value(p: &Position, prices: &Prices) -> Option<u128> {
    value_of(p.collateral_amount, prices.collateral_price)
}

/// Debt value in reference currency
pub fn debt_value(p: &Position, prices: &Prices) -> Option<u128> {
    value_of(p.debt_amount, prices.index_price)
}

/// `collateral_value / debt_value` in basis points. `None` without debt value.
pub fn collateral_ratio_bps(p: &Position, prices: &Prices) -> Option<u128> {
    if !p.has_debt() {
        return None;
    }
    let debt = debt_value(p, prices)?;
    mul_div(collateral_value(p, prices)?, BPS_DENOMINATOR, debt)
}

/// `collateral_value / debt_value >= min_ratio`, compared on the raw
/// fixed-point products so neither side is rounded before the comparison:
///   collateral * collateral_price * 10_000 >= debt * index_price * min_ratio
/// `None` on overflow.
pub fn meets_min_ratio(p: &Position, prices: &Prices, min_ratio_bps: u64) -> Option<bool> {
    let lhs = p.collateral_amount.checked_mul(prices.collateral_price)?.checked_mul(BPS_DENOMINATOR)?;
    let rhs = p.debt_amount.checked_mul(prices.index_price)?.checked_mul(min_ratio_bps as u128)?;
    Some(lhs >= rhs)
}

/// Check if a position is liquidatable
/// A position is liquidatable if it carries debt and:
///   collateral_value * 10_000 < debt_value * min_collateral_ratio_bps
pub fn is_liquidatable(p: &Position, prices: &Prices, params: &Params) -> bool {
    // No debt, no constraint
    if !p.has_debt() {
        return false;
    }

    // Same unrounded products as `meets_min_ratio`
    let collateral_scaled = p
        .collateral_amount
        .saturating_mul(prices.collateral_price)
        .saturating_mul(BPS_DENOMINATOR);
    let required_scaled = p
        .debt_amount
        .saturating_mul(prices.index_price)
        .saturating_mul(params.min_collateral_ratio_bps as u128);

    collateral_scaled < required_scaled
}

/// Debt ceiling for a position: `(collateral_value / index_price) / (min_ratio / 100)`
pub fn max_mintable(p: &Position, prices: &Prices, params: &Params) -> Option<Amount> {
    let collateral = collateral_value(p, prices)?;
    let max_debt_value = mul_div(collateral, BPS_DENOMINATOR, params.min_collateral_ratio_bps as u128)?;
    units_for(max_debt_value, prices.index_price)
}

/// Collateral price at which the ratio equals the minimum
pub fn liquidation_price(p: &Position, prices: &Prices, params: &Params) -> Option<Price> {
    if !p.has_debt() || p.collateral_amount == 0 {
        return None;
    }
    let required = apply_bps(debt_value(p, prices)?, params.min_collateral_ratio_bps)?;
    mul_div(required, AMOUNT_SCALE, p.collateral_amount)
}

pub fn sum_collateral(l: &Ledger) -> Option<Amount> {
    l.positions().try_fold(0u128, |acc, (_, p)| add(acc, p.collateral_amount))
}

pub fn sum_debt(l: &Ledger) -> Option<Amount> {
    l.positions().try_fold(0u128, |acc, (_, p)| add(acc, p.debt_amount))
}

pub fn sum_accrued_fees(l: &Ledger) -> Option<Amount> {
    l.positions().try_fold(0u128, |acc, (_, p)| add(acc, p.accrued_fee))
}

/// Aggregates agree with the positions:
/// total_collateral == sum(collateral), circulating_supply == sum(debt),
/// TVL == total_collateral marked at `collateral_mark`
pub fn conservation_ok(l: &Ledger) -> bool {
    let s = l.state();
    let Some(collateral) = sum_collateral(l) else { return false };
    let Some(debt) = sum_debt(l) else { return false };

    collateral == s.total_collateral
        && debt == s.circulating_supply
        && value_of(collateral, s.collateral_mark) == Some(s.total_value_locked)
}

/// TVL equals the sum of collateral valued at `collateral_price`
pub fn tvl_matches(l: &Ledger, collateral_price: Price) -> bool {
    sum_collateral(l)
        .and_then(|c| value_of(c, collateral_price))
        .map_or(false, |v| v == l.state().total_value_locked)
}

/// Revenue and every accrued fee are at least what they were
pub fn fees_monotone(before: &Ledger, after: &Ledger) -> bool {
    if after.state().protocol_revenue < before.state().protocol_revenue {
        return false;
    }
    before.positions().all(|(owner, a)| {
        after
            .position(owner)
            .map_or(false, |b| b.accrued_fee >= a.accrued_fee)
    })
}

/// Count liquidatable positions
pub fn liquidatable_count(l: &Ledger, prices: &Prices) -> usize {
    l.positions()
        .filter(|(_, p)| is_liquidatable(p, prices, l.params()))
        .count()
}

/// First liquidatable owner in key order
pub fn first_liquidatable(l: &Ledger, prices: &Prices) -> Option<Owner> {
    l.positions()
        .find(|(_, p)| is_liquidatable(p, prices, l.params()))
        .map(|(owner, _)| owner.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: u128 = AMOUNT_SCALE;

    fn scenario_prices() -> Prices {
        Prices::new(49_360_000_000, 145_500_000_000)
    }

    fn position(collateral: u128, debt: u128) -> Position {
        Position { collateral_amount: collateral, debt_amount: debt, ..Position::default() }
    }

    #[test]
    fn test_ratio_undefined_without_debt() {
        let p = position(10 * ONE, 0);
        assert_eq!(collateral_ratio_bps(&p, &scenario_prices()), None);
        assert!(!is_liquidatable(&p, &scenario_prices(), &Params::default()));
    }

    #[test]
    fn test_ratio_matches_formula() {
        let p = position(10 * ONE, 19_649_000_000);
        // 1455.00 / 969.87464 = 150.019%
        assert_eq!(collateral_ratio_bps(&p, &scenario_prices()), Some(15_001));
    }

    #[test]
    fn test_exact_minimum_is_healthy() {
        // 3.0 collateral vs 2.0 debt at parity = 150%
        let p = position(3 * ONE, 2 * ONE);
        let prices = Prices::new(ONE, ONE);
        assert_eq!(meets_min_ratio(&p, &prices, 15_000), Some(true));
        assert!(!is_liquidatable(&p, &prices, &Params::default()));
    }

    #[test]
    fn test_just_below_minimum_is_liquidatable() {
        let p = position(3 * ONE, 2 * ONE + 1);
        let prices = Prices::new(ONE, ONE);
        assert!(is_liquidatable(&p, &prices, &Params::default()));
    }

    #[test]
    fn test_sub_unit_debt_value_still_needs_collateral() {
        // 1e-9 debt at 0.50 is worth less than one value unit
        let p = position(0, 1);
        let prices = Prices::new(ONE / 2, ONE);

        assert_eq!(debt_value(&p, &prices), Some(0));
        assert_eq!(meets_min_ratio(&p, &prices, 15_000), Some(false));
        assert!(is_liquidatable(&p, &prices, &Params::default()));
    }

    #[test]
    fn test_meets_min_ratio_overflow_is_none() {
        let p = position(u128::MAX, 1);
        assert_eq!(meets_min_ratio(&p, &scenario_prices(), 15_000), None);
    }

    #[test]
    fn test_max_mintable_scenario() {
        let p = position(10 * ONE, 0);
        assert_eq!(
            max_mintable(&p, &scenario_prices(), &Params::default()),
            Some(19_651_539_708)
        );
    }

    #[test]
    fn test_liquidation_price_scenario() {
        let p = position(10 * ONE, 19_649_000_000);
        // 969.87464 * 1.5 / 10
        assert_eq!(
            liquidation_price(&p, &scenario_prices(), &Params::default()),
            Some(145_481_196_000)
        );
    }

    #[test]
    fn test_liquidation_price_none_without_debt() {
        let p = position(10 * ONE, 0);
        assert_eq!(liquidation_price(&p, &scenario_prices(), &Params::default()), None);
    }

    #[test]
    fn test_empty_ledger_conserves() {
        let l = Ledger::new(Params::default()).unwrap();
        assert!(conservation_ok(&l));
        assert!(tvl_matches(&l, 145_500_000_000));
        assert_eq!(liquidatable_count(&l, &scenario_prices()), 0);
        assert_eq!(first_liquidatable(&l, &scenario_prices()), None);
    }
}
