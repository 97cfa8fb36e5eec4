//! Kani safety proofs for ledger accounting

use kani::{any, assume};
use rei_ledger::fees::fee_increment;
use rei_ledger::helpers::{conservation_ok, fees_monotone, is_liquidatable, max_mintable};
use crate::{adversary::*, generators::*, sanitizer::*};

/// Conservation
/// Aggregates agree with the position across short adversary sequences
#[kani::proof]
#[kani::unwind(6)]
fn conservation_holds_across_short_adversary_sequences() {
    let params = any_params();
    let prices = any_prices();
    let Ok(mut ledger) = single_holder_ledger(params, any_position(), prices.collateral_price) else {
        return;
    };
    let mut wallet = Wallet(any::<u64>() as u128);

    let mut steps: u8 = any();
    steps = (steps % MAX_STEPS) + 1;

    for _ in 0..steps {
        adversary_step(&mut ledger, &mut wallet, &prices);
        kani::assert(conservation_ok(&ledger), "aggregates must match positions");
    }
}

/// Atomicity
/// A rejected operation leaves ledger and wallet untouched
#[kani::proof]
#[kani::unwind(4)]
fn rejected_step_changes_nothing() {
    let prices = any_prices();
    let Ok(mut ledger) = single_holder_ledger(any_params(), any_position(), prices.collateral_price) else {
        return;
    };
    let mut wallet = Wallet(any::<u64>() as u128);
    let before = (ledger.clone(), wallet);

    if !adversary_step(&mut ledger, &mut wallet, &prices) {
        kani::assert(before.0 == ledger, "ledger unchanged on error");
        kani::assert(before.1 == wallet, "wallet unchanged on error");
    }
}

/// Fee accrual never lowers revenue or any accrued fee
#[kani::proof]
#[kani::unwind(4)]
fn accrual_is_monotone() {
    let prices = any_prices();
    let Ok(mut ledger) = single_holder_ledger(any_params(), any_position(), prices.collateral_price) else {
        return;
    };
    let before = ledger.clone();
    let elapsed: u32 = any();

    let _ = ledger.accrue_fees(&prices, elapsed as u64);

    kani::assert(fees_monotone(&before, &ledger), "fees only grow");
}

/// The per-position fee grows with elapsed time
#[kani::proof]
fn fee_increment_monotone_in_time() {
    let debt_value: u64 = any();
    let fee_bps: u16 = any();
    let a: u32 = any();
    let b: u32 = any();
    assume(a <= b);

    let fa = fee_increment(debt_value as u128, fee_bps as u64, a as u64);
    let fb = fee_increment(debt_value as u128, fee_bps as u64, b as u64);

    if let (Some(fa), Some(fb)) = (fa, fb) {
        kani::assert(fa <= fb, "longer windows never accrue less");
    }
}

/// A fresh position can mint up to its ceiling, and an accepted mint never
/// leaves the position liquidatable
#[kani::proof]
#[kani::unwind(4)]
fn mint_respects_ceiling() {
    let params = any_params();
    let prices = any_prices();
    let mut position = any_position();
    position.debt_amount = 0;
    let Ok(mut ledger) = single_holder_ledger(params.clone(), position, prices.collateral_price) else {
        return;
    };
    let Some(max) = max_mintable(&position, &prices, &params) else {
        return;
    };

    if max > 0 {
        let mut at_ceiling = ledger.clone();
        kani::assert(at_ceiling.mint(&prices, &holder(), max).is_ok(), "minting the ceiling succeeds");
    }

    let amount: u64 = any();
    if ledger.mint(&prices, &holder(), amount as u128).is_ok() {
        let minted = ledger.position(&holder()).copied().unwrap_or_default();
        kani::assert(!is_liquidatable(&minted, &prices, &params), "accepted mint stays healthy");
    }
}
