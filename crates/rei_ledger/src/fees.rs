//! Stability fee accrual
//!
//! Fees are tracked per position and credited to protocol revenue. They are
//! never folded into `debt_amount`, so they do not move the collateral ratio.

use log::{debug, trace};

use crate::error::{LedgerError, OrOverflow, Result};
use crate::helpers::debt_value;
use crate::math::*;
use crate::sources::{PriceSource, Prices};
use crate::state::{Ledger, Owner};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccrualReport {
    pub elapsed_secs: u64,
    pub positions_charged: usize,
    pub total_fee: u128,
}

/// Fee owed on `debt_value` for `elapsed_secs` at an annual `fee_bps`
pub fn fee_increment(debt_value: u128, fee_bps: u64, elapsed_secs: u64) -> Option<u128> {
    fee_with_carry(debt_value, fee_bps, elapsed_secs, 0).map(|(fee, _)| fee)
}

/// Like [`fee_increment`], but adds the `carry` left by the previous step
/// to the numerator and returns the new remainder alongside the fee.
pub fn fee_with_carry(debt_value: u128, fee_bps: u64, elapsed_secs: u64, carry: u128) -> Option<(u128, u128)> {
    let annual = debt_value.checked_mul(fee_bps as u128)?;
    let accrued = annual.checked_mul(elapsed_secs as u128)?.checked_add(carry)?;
    Some((accrued / FEE_DENOMINATOR, accrued % FEE_DENOMINATOR))
}

impl Ledger {
    /// Charge every indebted position for `elapsed_secs` at the index price
    /// in `prices`. All increments are computed before any is applied.
    pub fn accrue_fees(&mut self, prices: &Prices, elapsed_secs: u64) -> Result<AccrualReport> {
        if elapsed_secs == 0 {
            return Ok(AccrualReport::default());
        }

        let fee_bps = self.params.stability_fee_bps;
        // (owner, fee, new accrued_fee, new carry)
        let mut charges: Vec<(Owner, u128, u128, u128)> = Vec::new();
        let mut total_fee = 0u128;

        for (owner, position) in self.positions.iter().filter(|(_, p)| p.has_debt()) {
            let value = debt_value(position, prices).or_overflow()?;
            let (fee, carry) = fee_with_carry(value, fee_bps, elapsed_secs, position.fee_carry).or_overflow()?;
            let accrued = add(position.accrued_fee, fee).or_overflow()?;
            total_fee = add(total_fee, fee).or_overflow()?;
            charges.push((owner.clone(), fee, accrued, carry));
        }
        let revenue = add(self.state.protocol_revenue, total_fee).or_overflow()?;

        let positions_charged = charges.len();
        for (owner, fee, accrued, carry) in charges {
            if let Some(position) = self.positions.get_mut(&owner) {
                position.accrued_fee = accrued;
                position.fee_carry = carry;
                trace!("fee: owner={} fee={}", owner, from_amount(fee));
            }
        }
        self.state.protocol_revenue = revenue;

        debug!(
            "accrual: elapsed={}s positions={} total_fee={} revenue={}",
            elapsed_secs,
            positions_charged,
            from_amount(total_fee),
            from_amount(revenue)
        );

        Ok(AccrualReport { elapsed_secs, positions_charged, total_fee })
    }
}

/// Recurring accrual task. Measures elapsed time itself so scheduler jitter
/// does not distort the fee math.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeeAccrualEngine {
    last_accrual: Option<Timestamp>,
}

impl FeeAccrualEngine {
    /// Engine whose first tick only sets the baseline
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that accrues from `ts` on the first tick
    pub fn starting_at(ts: Timestamp) -> Self {
        Self { last_accrual: Some(ts) }
    }

    pub fn last_accrual(&self) -> Option<Timestamp> {
        self.last_accrual
    }

    /// Run one accrual step ending at `now`.
    ///
    /// The index price is read once and paired with the interval it closes.
    /// A clock that moved backwards accrues nothing and keeps the baseline.
    /// On error the baseline is not advanced, so the interval is retried.
    pub fn tick<P>(&mut self, ledger: &mut Ledger, prices: &P, now: Timestamp) -> Result<AccrualReport>
    where
        P: PriceSource + ?Sized,
    {
        let Some(last) = self.last_accrual else {
            self.last_accrual = Some(now);
            return Ok(AccrualReport::default());
        };
        if now <= last {
            return Ok(AccrualReport::default());
        }

        let index_price = prices.current_index_price()?;
        if index_price == 0 {
            return Err(LedgerError::InvalidPrice);
        }
        let snapshot = Prices {
            index_price,
            // Accrual values debt only
            collateral_price: ledger.state.collateral_mark,
        };
        let report = ledger.accrue_fees(&snapshot, now - last)?;
        self.last_accrual = Some(now);
        Ok(report)
    }
}
