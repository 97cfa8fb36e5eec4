//! Health snapshots for indebted positions

use rei_ledger::helpers::{collateral_ratio_bps, collateral_value, debt_value, liquidation_price};
use rei_ledger::{Health, Ledger, Owner, Params, Position, Price, Prices};

/// Position health at one price snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionHealth {
    pub owner: Owner,
    /// Collateralization ratio in bps (`None` when debt rounds to zero value)
    pub ratio_bps: Option<u128>,
    pub collateral_value: u128,
    pub debt_value: u128,
    pub liquidation_price: Option<Price>,
    pub health: Health,
}

impl PositionHealth {
    /// Sort key: lower is closer to liquidation. A liquidatable position
    /// whose debt rounds to zero value sorts first.
    pub fn priority(&self) -> u128 {
        match self.ratio_bps {
            Some(ratio) => ratio,
            None if self.needs_liquidation() => 0,
            None => u128::MAX,
        }
    }

    pub fn needs_liquidation(&self) -> bool {
        self.health == Health::Liquidatable
    }

    /// Healthy but within `buffer_bps` of the minimum ratio
    pub fn in_preliq_zone(&self, min_ratio_bps: u64, buffer_bps: u64) -> bool {
        let ceiling = min_ratio_bps as u128 + buffer_bps as u128;
        !self.needs_liquidation() && self.priority() < ceiling
    }
}

/// Calculate health for a single position
pub fn calculate_health(owner: &Owner, position: &Position, prices: &Prices, params: &Params) -> PositionHealth {
    PositionHealth {
        owner: owner.clone(),
        ratio_bps: collateral_ratio_bps(position, prices),
        collateral_value: collateral_value(position, prices).unwrap_or(u128::MAX),
        debt_value: debt_value(position, prices).unwrap_or(u128::MAX),
        liquidation_price: liquidation_price(position, prices, params),
        health: Health::of(position, prices, params),
    }
}

/// Health of every position carrying debt. Debt-free positions are always
/// healthy and are left out.
pub fn assess(ledger: &Ledger, prices: &Prices) -> Vec<PositionHealth> {
    ledger
        .positions()
        .filter(|(_, p)| p.has_debt())
        .map(|(owner, p)| calculate_health(owner, p, prices, ledger.params()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rei_ledger::{InMemoryBalances, AMOUNT_SCALE};

    const ONE: u128 = AMOUNT_SCALE;

    fn prices(collateral_price: u128) -> Prices {
        Prices::new(49_360_000_000, collateral_price)
    }

    fn position(collateral: u128, debt: u128) -> Position {
        Position { collateral_amount: collateral, debt_amount: debt, ..Position::default() }
    }

    #[test]
    fn test_calculate_health_below_min() {
        let h = calculate_health(
            &Owner::from("alice"),
            &position(10 * ONE, 19_649_000_000),
            &prices(130 * ONE),
            &Params::default(),
        );

        assert_eq!(h.ratio_bps, Some(13_403));
        assert!(h.needs_liquidation());
        assert!(!h.in_preliq_zone(15_000, 1_000));
    }

    #[test]
    fn test_calculate_health_in_preliq_zone() {
        let h = calculate_health(
            &Owner::from("alice"),
            &position(10 * ONE, 19_649_000_000),
            &prices(145_500_000_000),
            &Params::default(),
        );

        // 150.02% is healthy but inside a 10% warning band
        assert_eq!(h.health, Health::Healthy);
        assert!(h.in_preliq_zone(15_000, 1_000));
        assert_eq!(h.liquidation_price, Some(145_481_196_000));
        assert_eq!(h.collateral_value, 1_455 * ONE);
        assert_eq!(h.debt_value, 969_874_640_000);
    }

    #[test]
    fn test_calculate_health_comfortable() {
        let h = calculate_health(
            &Owner::from("alice"),
            &position(10 * ONE, 5 * ONE),
            &prices(145_500_000_000),
            &Params::default(),
        );

        assert!(!h.needs_liquidation());
        assert!(!h.in_preliq_zone(15_000, 1_000));
    }

    #[test]
    fn test_sub_unit_debt_sorts_first_when_liquidatable() {
        let h = calculate_health(
            &Owner::from("dust"),
            &position(0, 1),
            &Prices::new(ONE / 2, 145_500_000_000),
            &Params::default(),
        );

        assert_eq!(h.ratio_bps, None);
        assert!(h.needs_liquidation());
        assert_eq!(h.priority(), 0);
    }

    #[test]
    fn test_assess_skips_debt_free_positions() {
        let mut ledger = Ledger::new(Params::default()).unwrap();
        let mut book = InMemoryBalances::new();
        let alice = Owner::from("alice");
        let bob = Owner::from("bob");
        book.set(alice.clone(), 10 * ONE);
        book.set(bob.clone(), 10 * ONE);
        let p = prices(145_500_000_000);

        ledger.deposit(&mut book, &p, &alice, 10 * ONE).unwrap();
        ledger.deposit(&mut book, &p, &bob, 10 * ONE).unwrap();
        ledger.mint(&p, &bob, ONE).unwrap();

        let snapshot = assess(&ledger, &p);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner, bob);
    }
}
