//! Generators for arbitrary state (for Kani)

#[cfg(kani)]
use kani::any;
use rei_ledger::math::value_of;
use rei_ledger::{Ledger, LedgerState, Owner, Params, Position, Price, Result};
use std::collections::BTreeMap;

#[cfg(kani)]
use crate::sanitizer::Sanitize;
#[cfg(kani)]
use rei_ledger::Prices;

pub fn holder() -> Owner {
    Owner::from("holder")
}

#[cfg(kani)]
pub fn any_position() -> Position {
    let collateral_raw: u64 = any();
    let debt_raw: u64 = any();
    let fee_raw: u32 = any();
    let carry_raw: u64 = any();

    Position {
        collateral_amount: collateral_raw as u128,
        debt_amount: debt_raw as u128,
        accrued_fee: fee_raw as u128,
        fee_carry: carry_raw as u128,
    }
    .sanitize()
}

#[cfg(kani)]
pub fn any_prices() -> Prices {
    let index_raw: u64 = any();
    let collateral_raw: u64 = any();

    Prices::new(index_raw as u128, collateral_raw as u128).sanitize()
}

#[cfg(kani)]
pub fn any_params() -> Params {
    let ratio_raw: u16 = any();
    let fee_raw: u16 = any();
    let penalty_raw: u16 = any();
    let threshold_raw: u32 = any();

    Params {
        min_collateral_ratio_bps: ratio_raw as u64,
        stability_fee_bps: fee_raw as u64,
        liquidation_penalty_bps: penalty_raw as u64,
        buyback_threshold: threshold_raw as u128,
    }
    .sanitize()
}

/// Ledger holding one position, with aggregates derived from it
pub fn single_holder_ledger(params: Params, position: Position, mark: Price) -> Result<Ledger> {
    let state = LedgerState {
        total_value_locked: value_of(position.collateral_amount, mark).unwrap_or(u128::MAX),
        total_collateral: position.collateral_amount,
        collateral_mark: mark,
        circulating_supply: position.debt_amount,
        ..LedgerState::default()
    };

    let mut positions = BTreeMap::new();
    positions.insert(holder(), position);
    Ledger::from_parts(params, state, positions)
}
