//! Position manager: deposit/withdraw collateral, mint/burn synthetic debt
//!
//! Each operation validates every precondition and pre-computes every new
//! value before the first write, so a failure leaves the ledger untouched.
//! External balance movements happen last before the commit.

use log::debug;

use crate::error::{LedgerError, OrOverflow, Result};
use crate::helpers::*;
use crate::liquidation::Health;
use crate::math::*;
use crate::sources::{BalanceSource, PriceSource, Prices};
use crate::state::{Ledger, Owner, Position};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositReceipt {
    pub amount: Amount,
    pub collateral_amount: Amount,
    /// TVL added at the collateral price read for this deposit
    pub value_added: u128,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub amount: Amount,
    pub collateral_amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MintReceipt {
    pub amount: Amount,
    pub debt_amount: Amount,
    pub ratio_bps: Option<u128>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnReceipt {
    pub amount: Amount,
    pub debt_amount: Amount,
}

/// Read-only valuation of one position
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionView {
    pub position: Position,
    pub collateral_value: u128,
    pub debt_value: u128,
    pub ratio_bps: Option<u128>,
    pub liquidation_price: Option<Price>,
    pub max_mintable: Amount,
    pub health: Health,
}

impl Ledger {
    /// Lock collateral. Creates the position on first deposit.
    pub fn deposit<B, P>(
        &mut self,
        balances: &mut B,
        prices: &P,
        owner: &Owner,
        amount: Amount,
    ) -> Result<DepositReceipt>
    where
        B: BalanceSource + ?Sized,
        P: PriceSource + ?Sized,
    {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let collateral_price = prices.collateral_reference_price()?;
        if collateral_price == 0 {
            return Err(LedgerError::InvalidPrice);
        }

        let available = balances.available_balance(owner)?;
        if amount > available {
            return Err(LedgerError::InsufficientBalance { requested: amount, available });
        }

        let current = self.positions.get(owner).copied().unwrap_or_default();
        let collateral_amount = add(current.collateral_amount, amount).or_overflow()?;
        let total_collateral = add(self.state.total_collateral, amount).or_overflow()?;
        let tvl = value_of(total_collateral, collateral_price).or_overflow()?;
        let value_added = value_of(amount, collateral_price).or_overflow()?;

        balances.debit(owner, amount)?;

        self.positions.entry(owner.clone()).or_default().collateral_amount = collateral_amount;
        self.state.total_collateral = total_collateral;
        self.state.total_value_locked = tvl;
        self.state.collateral_mark = collateral_price;

        debug!(
            "deposit: owner={} amount={} collateral={} tvl={}",
            owner,
            from_amount(amount),
            from_amount(collateral_amount),
            from_amount(tvl)
        );

        Ok(DepositReceipt { amount, collateral_amount, value_added })
    }

    /// Release collateral back to the owner's balance. With debt outstanding
    /// the remaining collateral must still meet the minimum ratio.
    pub fn withdraw<B, P>(
        &mut self,
        balances: &mut B,
        prices: &P,
        owner: &Owner,
        amount: Amount,
    ) -> Result<WithdrawReceipt>
    where
        B: BalanceSource + ?Sized,
        P: PriceSource + ?Sized,
    {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let current = *self.existing(owner)?;
        let collateral_amount = sub(current.collateral_amount, amount).ok_or(
            LedgerError::InsufficientCollateral {
                requested: amount,
                collateral: current.collateral_amount,
            },
        )?;

        let collateral_price = if current.has_debt() {
            let snapshot = prices.snapshot()?;
            let after = Position { collateral_amount, ..current };
            if !meets_min_ratio(&after, &snapshot, self.params.min_collateral_ratio_bps).or_overflow()? {
                return Err(LedgerError::BelowMinCollateralRatio);
            }
            snapshot.collateral_price
        } else {
            let price = prices.collateral_reference_price()?;
            if price == 0 {
                return Err(LedgerError::InvalidPrice);
            }
            price
        };

        let total_collateral = sub(self.state.total_collateral, amount).or_overflow()?;
        let tvl = value_of(total_collateral, collateral_price).or_overflow()?;

        balances.credit(owner, amount)?;

        if let Some(position) = self.positions.get_mut(owner) {
            position.collateral_amount = collateral_amount;
        }
        self.state.total_collateral = total_collateral;
        self.state.total_value_locked = tvl;
        self.state.collateral_mark = collateral_price;

        debug!(
            "withdraw: owner={} amount={} collateral={}",
            owner,
            from_amount(amount),
            from_amount(collateral_amount)
        );

        Ok(WithdrawReceipt { amount, collateral_amount })
    }

    /// Mint synthetic tokens against the position's collateral
    pub fn mint<P>(&mut self, prices: &P, owner: &Owner, amount: Amount) -> Result<MintReceipt>
    where
        P: PriceSource + ?Sized,
    {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let current = *self.existing(owner)?;
        let snapshot = prices.snapshot()?;

        let after = Position {
            debt_amount: add(current.debt_amount, amount).or_overflow()?,
            ..current
        };
        if !meets_min_ratio(&after, &snapshot, self.params.min_collateral_ratio_bps).or_overflow()? {
            return Err(LedgerError::BelowMinCollateralRatio);
        }
        let supply = add(self.state.circulating_supply, amount).or_overflow()?;

        if let Some(position) = self.positions.get_mut(owner) {
            position.debt_amount = after.debt_amount;
        }
        self.state.circulating_supply = supply;

        let ratio_bps = collateral_ratio_bps(&after, &snapshot);
        debug!(
            "mint: owner={} amount={} debt={} ratio_bps={:?}",
            owner,
            from_amount(amount),
            from_amount(after.debt_amount),
            ratio_bps
        );

        Ok(MintReceipt { amount, debt_amount: after.debt_amount, ratio_bps })
    }

    /// Repay synthetic debt
    pub fn burn(&mut self, owner: &Owner, amount: Amount) -> Result<BurnReceipt> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let current = *self.existing(owner)?;
        let debt_amount = sub(current.debt_amount, amount).ok_or(LedgerError::ExceedsDebt {
            requested: amount,
            debt: current.debt_amount,
        })?;
        let supply = sub(self.state.circulating_supply, amount).or_overflow()?;

        if let Some(position) = self.positions.get_mut(owner) {
            position.debt_amount = debt_amount;
        }
        self.state.circulating_supply = supply;

        debug!("burn: owner={} amount={} debt={}", owner, from_amount(amount), from_amount(debt_amount));

        Ok(BurnReceipt { amount, debt_amount })
    }

    /// Collateralization ratio in basis points; `None` for a debt-free position
    pub fn collateral_ratio_bps(&self, owner: &Owner, prices: &Prices) -> Result<Option<u128>> {
        Ok(collateral_ratio_bps(self.existing(owner)?, prices))
    }

    /// Total debt the position may carry at these prices
    pub fn max_mintable(&self, owner: &Owner, prices: &Prices) -> Result<Amount> {
        max_mintable(self.existing(owner)?, prices, &self.params).or_overflow()
    }

    pub fn liquidation_price(&self, owner: &Owner, prices: &Prices) -> Result<Option<Price>> {
        Ok(liquidation_price(self.existing(owner)?, prices, &self.params))
    }

    pub fn position_view(&self, owner: &Owner, prices: &Prices) -> Result<PositionView> {
        let position = *self.existing(owner)?;
        Ok(PositionView {
            position,
            collateral_value: collateral_value(&position, prices).or_overflow()?,
            debt_value: debt_value(&position, prices).or_overflow()?,
            ratio_bps: collateral_ratio_bps(&position, prices),
            liquidation_price: liquidation_price(&position, prices, &self.params),
            max_mintable: max_mintable(&position, prices, &self.params).or_overflow()?,
            health: Health::of(&position, prices, &self.params),
        })
    }
}
