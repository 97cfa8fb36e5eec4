//! Ledger data model: positions, protocol aggregates and parameters

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, OrOverflow, Result};
use crate::helpers::{sum_collateral, sum_debt};
use crate::math::*;
use crate::sources::Prices;

/// Opaque participant identity
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Owner(String);

impl Owner {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Owner {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Owner {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One participant vault
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub collateral_amount: Amount,
    pub debt_amount: Amount,
    /// Stability fee owed but never settled; not part of `debt_amount`
    pub accrued_fee: Amount,
    /// Fee numerator left over from the last accrual division, carried so
    /// that tick cadence does not change the total charged
    #[serde(default)]
    pub fee_carry: u128,
}

impl Position {
    pub fn has_debt(&self) -> bool {
        self.debt_amount > 0
    }

    pub fn is_empty(&self) -> bool {
        self.collateral_amount == 0 && self.debt_amount == 0 && self.accrued_fee == 0
    }

    pub(crate) fn reset(&mut self) {
        *self = Position::default();
    }
}

/// Protocol-wide constants. Rates are in basis points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Ratio below which a position with debt is liquidatable (15_000 = 150%)
    pub min_collateral_ratio_bps: u64,
    /// Annual stability fee on outstanding debt value (200 = 2.0%)
    pub stability_fee_bps: u64,
    /// Share of debt value charged on liquidation (1_000 = 10%)
    pub liquidation_penalty_bps: u64,
    /// Revenue must exceed this before a buyback may run
    pub buyback_threshold: Amount,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            min_collateral_ratio_bps: 15_000,
            stability_fee_bps: 200,
            liquidation_penalty_bps: 1_000,
            buyback_threshold: 1_000 * AMOUNT_SCALE,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        if self.min_collateral_ratio_bps == 0 {
            return Err(LedgerError::InvalidParams("min_collateral_ratio_bps must be positive"));
        }
        if self.liquidation_penalty_bps as u128 > BPS_DENOMINATOR {
            return Err(LedgerError::InvalidParams("liquidation_penalty_bps exceeds 100%"));
        }
        Ok(())
    }
}

/// Protocol-wide aggregates
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Collateral value in reference currency, marked at `collateral_mark`
    pub total_value_locked: u128,
    /// Collateral units held across all positions
    pub total_collateral: Amount,
    /// Collateral price TVL was last marked at
    pub collateral_mark: Price,
    /// Synthetic tokens outstanding
    pub circulating_supply: Amount,
    pub protocol_revenue: u128,
    pub governance_burned_supply: Amount,
    /// Collateral units taken from liquidated positions, awaiting settlement
    pub seized_collateral: Amount,
}

/// The single controller every mutating operation goes through.
///
/// Operations live in `position`, `fees`, `liquidation` and `treasury`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    pub(crate) params: Params,
    pub(crate) state: LedgerState,
    pub(crate) positions: BTreeMap<Owner, Position>,
}

impl Ledger {
    pub fn new(params: Params) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            state: LedgerState::default(),
            positions: BTreeMap::new(),
        })
    }

    /// Rebuild a ledger from previously captured parts.
    ///
    /// Rejects parts whose aggregates disagree with the positions.
    pub fn from_parts(
        params: Params,
        state: LedgerState,
        positions: BTreeMap<Owner, Position>,
    ) -> Result<Self> {
        params.validate()?;
        let ledger = Self { params, state, positions };

        let collateral = sum_collateral(&ledger).or_overflow()?;
        let debt = sum_debt(&ledger).or_overflow()?;
        if collateral != ledger.state.total_collateral {
            return Err(LedgerError::InvalidParams("total_collateral disagrees with positions"));
        }
        if debt != ledger.state.circulating_supply {
            return Err(LedgerError::InvalidParams("circulating_supply disagrees with positions"));
        }
        let marked = value_of(collateral, ledger.state.collateral_mark).or_overflow()?;
        if marked != ledger.state.total_value_locked {
            return Err(LedgerError::InvalidParams("total_value_locked disagrees with collateral mark"));
        }

        Ok(ledger)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn position(&self, owner: &Owner) -> Option<&Position> {
        self.positions.get(owner)
    }

    pub fn positions(&self) -> impl Iterator<Item = (&Owner, &Position)> {
        self.positions.iter()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn existing(&self, owner: &Owner) -> Result<&Position> {
        self.positions
            .get(owner)
            .ok_or_else(|| LedgerError::UnknownPosition(owner.clone()))
    }

    /// Re-mark TVL at a new collateral price
    pub fn revalue(&mut self, collateral_price: Price) -> Result<u128> {
        if collateral_price == 0 {
            return Err(LedgerError::InvalidPrice);
        }
        let tvl = value_of(self.state.total_collateral, collateral_price).or_overflow()?;
        self.state.total_value_locked = tvl;
        self.state.collateral_mark = collateral_price;
        Ok(tvl)
    }

    /// Header figures for dashboards and log lines
    pub fn stats(&self, prices: &Prices) -> ProtocolStats {
        ProtocolStats {
            index_price: prices.index_price,
            collateral_price: prices.collateral_price,
            total_value_locked: self.state.total_value_locked,
            circulating_supply: self.state.circulating_supply,
            protocol_revenue: self.state.protocol_revenue,
            governance_burned_supply: self.state.governance_burned_supply,
            seized_collateral: self.state.seized_collateral,
            open_positions: self.positions.values().filter(|p| !p.is_empty()).count(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProtocolStats {
    pub index_price: Price,
    pub collateral_price: Price,
    pub total_value_locked: u128,
    pub circulating_supply: Amount,
    pub protocol_revenue: u128,
    pub governance_burned_supply: Amount,
    pub seized_collateral: Amount,
    pub open_positions: usize,
}
