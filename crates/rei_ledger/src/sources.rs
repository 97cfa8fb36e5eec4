//! Contracts with the collaborators the ledger does not own: price feeds and
//! custodial balances.
//!
//! Implementations are expected to be fast synchronous lookups. A failing
//! query aborts the calling operation before any state is touched.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::math::{Amount, Price};
use crate::state::Owner;

pub trait PriceSource {
    /// Price of one synthetic index token
    fn current_index_price(&self) -> Result<Price>;

    /// Price of one unit of collateral
    fn collateral_reference_price(&self) -> Result<Price>;

    /// Read both prices for one valuation. Zero prices are rejected.
    fn snapshot(&self) -> Result<Prices> {
        let prices = Prices {
            index_price: self.current_index_price()?,
            collateral_price: self.collateral_reference_price()?,
        };
        prices.validate()?;
        Ok(prices)
    }
}

pub trait GovernanceTokenPriceSource {
    fn current_price(&self) -> Result<Price>;
}

/// Owner's custodial collateral balance, held outside the ledger
pub trait BalanceSource {
    fn available_balance(&self, owner: &Owner) -> Result<Amount>;
    fn debit(&mut self, owner: &Owner, amount: Amount) -> Result<()>;
    fn credit(&mut self, owner: &Owner, amount: Amount) -> Result<()>;
}

/// Price pair admitted for a single valuation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prices {
    pub index_price: Price,
    pub collateral_price: Price,
}

impl Prices {
    pub fn new(index_price: Price, collateral_price: Price) -> Self {
        Self { index_price, collateral_price }
    }

    pub fn validate(&self) -> Result<()> {
        if self.index_price == 0 || self.collateral_price == 0 {
            return Err(LedgerError::InvalidPrice);
        }
        Ok(())
    }
}

impl PriceSource for Prices {
    fn current_index_price(&self) -> Result<Price> {
        Ok(self.index_price)
    }

    fn collateral_reference_price(&self) -> Result<Price> {
        Ok(self.collateral_price)
    }
}

/// Constant governance token price
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPrice(pub Price);

impl GovernanceTokenPriceSource for FixedPrice {
    fn current_price(&self) -> Result<Price> {
        Ok(self.0)
    }
}

/// Simple in-process balance book
#[derive(Clone, Debug, Default)]
pub struct InMemoryBalances {
    balances: HashMap<Owner, Amount>,
}

impl InMemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an owner's balance outright
    pub fn set(&mut self, owner: Owner, amount: Amount) {
        self.balances.insert(owner, amount);
    }

    pub fn get(&self, owner: &Owner) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn total(&self) -> Option<Amount> {
        self.balances.values().try_fold(0u128, |acc, b| acc.checked_add(*b))
    }
}

impl BalanceSource for InMemoryBalances {
    fn available_balance(&self, owner: &Owner) -> Result<Amount> {
        Ok(self.get(owner))
    }

    fn debit(&mut self, owner: &Owner, amount: Amount) -> Result<()> {
        let available = self.get(owner);
        let remaining = available
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance { requested: amount, available })?;
        self.balances.insert(owner.clone(), remaining);
        Ok(())
    }

    fn credit(&mut self, owner: &Owner, amount: Amount) -> Result<()> {
        let balance = self
            .get(owner)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        self.balances.insert(owner.clone(), balance);
        Ok(())
    }
}
