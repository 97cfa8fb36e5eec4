//! Simulated price feeds
//!
//! The index price wanders uniformly within `±jitter/2` of its configured
//! centre on every refresh. Collateral and governance prices stay where they
//! are set.

use anyhow::{ensure, Result};
use rand::Rng;
use rei_ledger::{GovernanceTokenPriceSource, Price, PriceSource, Prices};

use crate::config::{decimal, OracleConfig};

#[derive(Debug, Clone)]
pub struct SimulatedOracle {
    base_index: Price,
    jitter: Price,
    index_price: Price,
    collateral_price: Price,
    governance_price: Price,
}

impl SimulatedOracle {
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let base_index = decimal("oracle.index_price", config.index_price)?;
        let jitter = decimal("oracle.index_jitter", config.index_jitter)?;
        let collateral_price = decimal("oracle.collateral_price", config.collateral_price)?;
        let governance_price = decimal("oracle.governance_price", config.governance_price)?;

        ensure!(base_index > jitter / 2, "index_price must exceed half the jitter band");
        ensure!(collateral_price > 0, "collateral_price must be positive");
        ensure!(governance_price > 0, "governance_price must be positive");

        Ok(Self {
            base_index,
            jitter,
            index_price: base_index,
            collateral_price,
            governance_price,
        })
    }

    /// Draw a new index price
    pub fn refresh<R: Rng>(&mut self, rng: &mut R) -> Price {
        let offset = if self.jitter == 0 { 0 } else { rng.gen_range(0..=self.jitter) };
        self.index_price = (self.base_index - self.jitter / 2 + offset).max(1);
        self.index_price
    }

    pub fn set_collateral_price(&mut self, price: Price) {
        self.collateral_price = price;
    }

    pub fn prices(&self) -> Prices {
        Prices::new(self.index_price, self.collateral_price)
    }
}

impl PriceSource for SimulatedOracle {
    fn current_index_price(&self) -> rei_ledger::Result<Price> {
        Ok(self.index_price)
    }

    fn collateral_reference_price(&self) -> rei_ledger::Result<Price> {
        Ok(self.collateral_price)
    }
}

impl GovernanceTokenPriceSource for SimulatedOracle {
    fn current_price(&self) -> rei_ledger::Result<Price> {
        Ok(self.governance_price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_default_config() {
        let oracle = SimulatedOracle::from_config(&Config::default_local().oracle).unwrap();
        assert_eq!(oracle.prices(), Prices::new(49_360_000_000, 145_500_000_000));
        assert_eq!(oracle.current_price(), Ok(2_500_000_000));
    }

    #[test]
    fn test_refresh_stays_in_band() {
        let mut oracle = SimulatedOracle::from_config(&Config::default_local().oracle).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1_000 {
            let price = oracle.refresh(&mut rng);
            assert!(price >= 49_110_000_000 && price <= 49_610_000_000);
        }
    }

    #[test]
    fn test_zero_jitter_is_constant() {
        let mut config = Config::default_local().oracle;
        config.index_jitter = 0.0;
        let mut oracle = SimulatedOracle::from_config(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(oracle.refresh(&mut rng), 49_360_000_000);
    }

    #[test]
    fn test_rejects_non_positive_prices() {
        let mut config = Config::default_local().oracle;
        config.collateral_price = 0.0;
        assert!(SimulatedOracle::from_config(&config).is_err());

        config.collateral_price = -3.0;
        assert!(SimulatedOracle::from_config(&config).is_err());
    }
}
