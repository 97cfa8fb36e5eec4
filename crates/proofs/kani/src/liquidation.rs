//! Liquidation step-case proofs
//!
//! Each proof checks one liquidation against a single price snapshot.

use rei_ledger::helpers::{conservation_ok, is_liquidatable, liquidatable_count};
use rei_ledger::{LedgerError, Owner};
use crate::generators::*;

/// Only positions below the minimum ratio can be liquidated
#[kani::proof]
#[kani::unwind(4)]
fn liquidation_requires_predicate() {
    let params = any_params();
    let prices = any_prices();
    let position = any_position();
    let Ok(mut ledger) = single_holder_ledger(params.clone(), position, prices.collateral_price) else {
        return;
    };

    let result = ledger.liquidate(&prices, &holder(), &Owner::from("keeper"));

    if !is_liquidatable(&position, &prices, &params) {
        kani::assert(result == Err(LedgerError::NotLiquidatable), "healthy positions are left alone");
    }
}

/// A successful liquidation empties the position and charges the penalty
#[kani::proof]
#[kani::unwind(4)]
fn liquidation_resets_position() {
    let prices = any_prices();
    let position = any_position();
    let Ok(mut ledger) = single_holder_ledger(any_params(), position, prices.collateral_price) else {
        return;
    };
    let revenue_before = ledger.state().protocol_revenue;

    if let Ok(receipt) = ledger.liquidate(&prices, &holder(), &Owner::from("keeper")) {
        let after = ledger.position(&holder());
        kani::assert(after.map_or(false, |p| p.is_empty()), "position reset to empty");
        kani::assert(receipt.seized_collateral == position.collateral_amount, "all collateral seized");
        kani::assert(
            ledger.state().protocol_revenue == revenue_before + receipt.penalty,
            "penalty booked as revenue"
        );
        kani::assert(conservation_ok(&ledger), "aggregates still match");
    }
}

/// Liquidating shrinks the liquidatable set
#[kani::proof]
#[kani::unwind(4)]
fn liquidate_one_makes_progress() {
    let prices = any_prices();
    let Ok(mut ledger) = single_holder_ledger(any_params(), any_position(), prices.collateral_price) else {
        return;
    };

    let c0 = liquidatable_count(&ledger, &prices);
    let outcome = ledger.liquidate_one(&prices, &Owner::from("keeper"));
    let c1 = liquidatable_count(&ledger, &prices);

    if c0 > 0 && outcome.is_ok() {
        kani::assert(c1 < c0, "must reduce the set by at least one");
    } else if c0 == 0 {
        kani::assert(outcome.is_err(), "nothing to liquidate at fixpoint");
    }
}
