//! State space sanitizer - bounds values for Kani exploration

use rei_ledger::math::FEE_DENOMINATOR;
use rei_ledger::{Params, Position, Prices, AMOUNT_SCALE};

pub const MAX_STEPS: u8 = 4;

/// Bounds for tractable verification
const MAX_COLLATERAL: u128 = 1_000 * AMOUNT_SCALE;
const MAX_DEBT: u128 = 10_000 * AMOUNT_SCALE;
const MAX_FEE: u128 = 100 * AMOUNT_SCALE;
const MAX_PRICE: u128 = 1_000 * AMOUNT_SCALE;
const MAX_RATIO_BPS: u64 = 50_000;

pub trait Sanitize {
    fn sanitize(self) -> Self;
}

impl Sanitize for Position {
    fn sanitize(mut self) -> Position {
        self.collateral_amount %= MAX_COLLATERAL;
        self.debt_amount %= MAX_DEBT;
        self.accrued_fee %= MAX_FEE;
        self.fee_carry %= FEE_DENOMINATOR;
        self
    }
}

impl Sanitize for Prices {
    fn sanitize(mut self) -> Prices {
        // Prices are never zero once admitted
        self.index_price = self.index_price % MAX_PRICE + 1;
        self.collateral_price = self.collateral_price % MAX_PRICE + 1;
        self
    }
}

impl Sanitize for Params {
    fn sanitize(mut self) -> Params {
        self.min_collateral_ratio_bps = self.min_collateral_ratio_bps % MAX_RATIO_BPS + 1;
        self.stability_fee_bps %= 10_001;
        self.liquidation_penalty_bps %= 10_001;
        self.buyback_threshold %= MAX_FEE;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_prices_are_admissible() {
        let prices = Prices::new(0, u128::MAX).sanitize();
        assert!(prices.validate().is_ok());
        assert!(prices.collateral_price <= MAX_PRICE);
    }

    #[test]
    fn test_sanitized_params_validate() {
        let params = Params {
            min_collateral_ratio_bps: u64::MAX,
            stability_fee_bps: u64::MAX,
            liquidation_penalty_bps: u64::MAX,
            buyback_threshold: u128::MAX,
        }
        .sanitize();

        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_sanitized_position_in_bounds() {
        let p = Position {
            collateral_amount: u128::MAX,
            debt_amount: u128::MAX,
            accrued_fee: u128::MAX,
            fee_carry: u128::MAX,
        }
        .sanitize();

        assert!(p.collateral_amount < MAX_COLLATERAL);
        assert!(p.debt_amount < MAX_DEBT);
        assert!(p.accrued_fee < MAX_FEE);
        assert!(p.fee_carry < FEE_DENOMINATOR);
    }
}
