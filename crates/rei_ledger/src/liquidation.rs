//! Liquidation engine
//!
//! Health is a pure function of the position and current prices and is
//! never cached. Liquidation is permissionless: any participant may seize any
//! position that is `Liquidatable` at the prices read for the call.

use log::info;
use serde::Serialize;

use crate::error::{LedgerError, OrOverflow, Result};
use crate::helpers::*;
use crate::math::*;
use crate::sources::{PriceSource, Prices};
use crate::state::{Ledger, Owner, Params, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Health {
    /// Ratio at or above the minimum, or no debt
    Healthy,
    /// Debt outstanding and ratio below the minimum
    Liquidatable,
}

impl Health {
    pub fn of(p: &Position, prices: &Prices, params: &Params) -> Self {
        if is_liquidatable(p, prices, params) {
            Health::Liquidatable
        } else {
            Health::Healthy
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiquidationReceipt {
    pub owner: Owner,
    pub liquidator: Owner,
    /// Collateral units moved to `LedgerState::seized_collateral`
    pub seized_collateral: Amount,
    /// Value removed from TVL
    pub seized_value: u128,
    pub debt_cleared: Amount,
    pub debt_value: u128,
    /// Credited to protocol revenue
    pub penalty: u128,
    /// Accrued fee dropped with the position reset
    pub forfeited_fee: Amount,
}

impl Ledger {
    pub fn health(&self, owner: &Owner, prices: &Prices) -> Result<Health> {
        Ok(Health::of(self.existing(owner)?, prices, &self.params))
    }

    /// Every owner whose position is liquidatable at `prices`
    pub fn liquidatable_owners(&self, prices: &Prices) -> Vec<Owner> {
        self.positions
            .iter()
            .filter(|(_, p)| is_liquidatable(p, prices, &self.params))
            .map(|(owner, _)| owner.clone())
            .collect()
    }

    /// Seize an under-collateralized position.
    ///
    /// Charges `debt_value * liquidation_penalty` to protocol revenue, removes
    /// the collateral from TVL and the debt from supply, and resets the
    /// position to empty.
    pub fn liquidate<P>(&mut self, prices: &P, owner: &Owner, liquidator: &Owner) -> Result<LiquidationReceipt>
    where
        P: PriceSource + ?Sized,
    {
        let position = *self.existing(owner)?;
        let snapshot = prices.snapshot()?;

        if !is_liquidatable(&position, &snapshot, &self.params) {
            return Err(LedgerError::NotLiquidatable);
        }

        let seized_value = collateral_value(&position, &snapshot).or_overflow()?;
        let debt = debt_value(&position, &snapshot).or_overflow()?;
        let penalty = apply_bps(debt, self.params.liquidation_penalty_bps).or_overflow()?;

        let revenue = add(self.state.protocol_revenue, penalty).or_overflow()?;
        let total_collateral = sub(self.state.total_collateral, position.collateral_amount).or_overflow()?;
        let tvl = value_of(total_collateral, snapshot.collateral_price).or_overflow()?;
        let supply = sub(self.state.circulating_supply, position.debt_amount).or_overflow()?;
        let seized = add(self.state.seized_collateral, position.collateral_amount).or_overflow()?;

        if let Some(p) = self.positions.get_mut(owner) {
            p.reset();
        }
        self.state.protocol_revenue = revenue;
        self.state.total_collateral = total_collateral;
        self.state.total_value_locked = tvl;
        self.state.collateral_mark = snapshot.collateral_price;
        self.state.circulating_supply = supply;
        self.state.seized_collateral = seized;

        info!(
            "liquidated {} by {}: collateral={} debt={} penalty={}",
            owner,
            liquidator,
            from_amount(position.collateral_amount),
            from_amount(position.debt_amount),
            from_amount(penalty)
        );

        Ok(LiquidationReceipt {
            owner: owner.clone(),
            liquidator: liquidator.clone(),
            seized_collateral: position.collateral_amount,
            seized_value,
            debt_cleared: position.debt_amount,
            debt_value: debt,
            penalty,
            forfeited_fee: position.accrued_fee,
        })
    }

    /// Liquidate the first liquidatable position in owner order.
    /// Fails with `NotLiquidatable` when there is none.
    pub fn liquidate_one<P>(&mut self, prices: &P, liquidator: &Owner) -> Result<LiquidationReceipt>
    where
        P: PriceSource + ?Sized,
    {
        let snapshot = prices.snapshot()?;
        let owner = first_liquidatable(self, &snapshot).ok_or(LedgerError::NotLiquidatable)?;
        self.liquidate(&snapshot, &owner, liquidator)
    }
}
