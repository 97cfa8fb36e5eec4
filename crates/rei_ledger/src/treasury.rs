//! Treasury buyback and burn of the governance token

use log::info;

use crate::error::{LedgerError, OrOverflow, Result};
use crate::math::*;
use crate::sources::GovernanceTokenPriceSource;
use crate::state::Ledger;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuybackReceipt {
    pub revenue_spent: u128,
    pub governance_price: Price,
    pub burned: Amount,
}

impl Ledger {
    /// Spend all protocol revenue buying governance tokens and burn them.
    ///
    /// Requires revenue strictly above `buyback_threshold`.
    pub fn buyback_and_burn<G>(&mut self, governance: &G) -> Result<BuybackReceipt>
    where
        G: GovernanceTokenPriceSource + ?Sized,
    {
        let revenue = self.state.protocol_revenue;
        let threshold = self.params.buyback_threshold;
        if revenue <= threshold {
            return Err(LedgerError::InsufficientRevenue { revenue, threshold });
        }

        let governance_price = governance.current_price()?;
        if governance_price == 0 {
            return Err(LedgerError::InvalidPrice);
        }

        let burned = units_for(revenue, governance_price).or_overflow()?;
        let burned_supply = add(self.state.governance_burned_supply, burned).or_overflow()?;

        self.state.governance_burned_supply = burned_supply;
        self.state.protocol_revenue = 0;

        info!(
            "buyback: spent {} at {} burned {} GOV (total burned {})",
            from_amount(revenue),
            from_amount(governance_price),
            from_amount(burned),
            from_amount(burned_supply)
        );

        Ok(BuybackReceipt { revenue_spent: revenue, governance_price, burned })
    }
}
