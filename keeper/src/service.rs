//! Shared ledger host
//!
//! One mutex guards the ledger, the fee engine, custody balances and the
//! price feed together, so every operation below observes and leaves a
//! consistent state. The lock is held for the whole operation and never
//! across an await.

use anyhow::{Context, Result};
use rand::Rng;
use rei_ledger::{
    AccrualReport, BuybackReceipt, FeeAccrualEngine, InMemoryBalances, Ledger, LedgerError,
    LiquidationReceipt, Owner, Price, Prices, ProtocolStats, Timestamp,
};
use tokio::sync::Mutex;

use crate::config::{decimal, AccountSeed, Config};
use crate::health::{assess, PositionHealth};
use crate::oracle::SimulatedOracle;

struct Protocol {
    ledger: Ledger,
    fees: FeeAccrualEngine,
    custody: InMemoryBalances,
    oracle: SimulatedOracle,
}

pub struct LedgerService {
    inner: Mutex<Protocol>,
    keeper: Owner,
}

impl LedgerService {
    pub fn new(config: &Config) -> Result<Self> {
        let params = config.protocol.to_params()?;
        let ledger = Ledger::new(params).context("Failed to create ledger")?;
        let oracle = SimulatedOracle::from_config(&config.oracle)?;

        Ok(Self {
            inner: Mutex::new(Protocol {
                ledger,
                fees: FeeAccrualEngine::new(),
                custody: InMemoryBalances::new(),
                oracle,
            }),
            keeper: Owner::new(config.keeper_id.clone()),
        })
    }

    pub fn keeper(&self) -> &Owner {
        &self.keeper
    }

    /// Credit starting balances, then deposit and mint through the normal
    /// ledger operations.
    pub async fn seed(&self, accounts: &[AccountSeed]) -> Result<()> {
        let mut guard = self.inner.lock().await;
        let Protocol { ledger, custody, oracle, .. } = &mut *guard;

        for seed in accounts {
            let owner = Owner::new(seed.owner.clone());
            custody.set(owner.clone(), decimal("balance", seed.balance)?);

            let deposit = decimal("deposit", seed.deposit)?;
            if deposit > 0 {
                ledger
                    .deposit(custody, &*oracle, &owner, deposit)
                    .context(format!("Failed to seed deposit for {}", owner))?;
            }

            let mint = decimal("mint", seed.mint)?;
            if mint > 0 {
                ledger
                    .mint(&*oracle, &owner, mint)
                    .context(format!("Failed to seed mint for {}", owner))?;
            }

            log::info!("Opened account {} (deposit {}, mint {})", owner, seed.deposit, seed.mint);
        }

        Ok(())
    }

    pub async fn accrue(&self, now: Timestamp) -> Result<AccrualReport, LedgerError> {
        let mut guard = self.inner.lock().await;
        let Protocol { ledger, fees, oracle, .. } = &mut *guard;
        fees.tick(ledger, &*oracle, now)
    }

    /// Draw a new index price and re-mark TVL
    pub async fn refresh_prices<R: Rng>(&self, rng: &mut R) -> Result<Prices, LedgerError> {
        let mut guard = self.inner.lock().await;
        let Protocol { ledger, oracle, .. } = &mut *guard;
        oracle.refresh(rng);
        ledger.revalue(oracle.prices().collateral_price)?;
        Ok(oracle.prices())
    }

    /// Move the collateral reference price and re-mark TVL
    pub async fn set_collateral_price(&self, price: Price) -> Result<(), LedgerError> {
        let mut guard = self.inner.lock().await;
        let Protocol { ledger, oracle, .. } = &mut *guard;
        ledger.revalue(price)?;
        oracle.set_collateral_price(price);
        Ok(())
    }

    pub async fn assess(&self) -> Vec<PositionHealth> {
        let guard = self.inner.lock().await;
        assess(&guard.ledger, &guard.oracle.prices())
    }

    pub async fn liquidate(&self, owner: &Owner) -> Result<LiquidationReceipt, LedgerError> {
        let mut guard = self.inner.lock().await;
        let Protocol { ledger, oracle, .. } = &mut *guard;
        ledger.liquidate(&*oracle, owner, &self.keeper)
    }

    pub async fn buyback(&self) -> Result<BuybackReceipt, LedgerError> {
        let mut guard = self.inner.lock().await;
        let Protocol { ledger, oracle, .. } = &mut *guard;
        ledger.buyback_and_burn(&*oracle)
    }

    pub async fn stats(&self) -> ProtocolStats {
        let guard = self.inner.lock().await;
        guard.ledger.stats(&guard.oracle.prices())
    }

    /// Copy of the ledger for inspection
    pub async fn ledger(&self) -> Ledger {
        self.inner.lock().await.ledger.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rei_ledger::helpers::conservation_ok;
    use rei_ledger::AMOUNT_SCALE;
    use std::sync::Arc;

    const ONE: u128 = AMOUNT_SCALE;

    fn config() -> Config {
        let mut config = Config::default_local();
        config.oracle.index_jitter = 0.0;
        config.accounts = vec![AccountSeed {
            owner: "alice".to_string(),
            balance: 50.0,
            deposit: 10.0,
            mint: 19.649,
        }];
        config
    }

    async fn seeded() -> LedgerService {
        let config = config();
        let service = LedgerService::new(&config).unwrap();
        service.seed(&config.accounts).await.unwrap();
        service
    }

    #[tokio::test]
    async fn test_seed_opens_positions() {
        let service = seeded().await;
        let stats = service.stats().await;

        assert_eq!(stats.total_value_locked, 1_455 * ONE);
        assert_eq!(stats.circulating_supply, 19_649_000_000);
        assert_eq!(stats.open_positions, 1);
    }

    #[tokio::test]
    async fn test_seed_rejects_overcollateralized_mint() {
        let mut config = config();
        config.accounts[0].mint = 20.0;
        let service = LedgerService::new(&config).unwrap();

        assert!(service.seed(&config.accounts).await.is_err());
    }

    #[tokio::test]
    async fn test_price_shock_then_liquidate() {
        let service = seeded().await;
        let alice = Owner::from("alice");

        assert_eq!(service.liquidate(&alice).await, Err(LedgerError::NotLiquidatable));

        service.set_collateral_price(130 * ONE).await.unwrap();
        let receipt = service.liquidate(&alice).await.unwrap();

        assert_eq!(receipt.penalty, 96_987_464_000);
        assert_eq!(&receipt.liquidator, service.keeper());
        assert!(conservation_ok(&service.ledger().await));
    }

    #[tokio::test]
    async fn test_accrual_feeds_revenue() {
        let service = seeded().await;

        service.accrue(1_000).await.unwrap();
        let report = service.accrue(1_000 + 86_400).await.unwrap();

        assert_eq!(report.positions_charged, 1);
        assert!(service.stats().await.protocol_revenue > 0);
    }

    #[tokio::test]
    async fn test_buyback_below_threshold() {
        let service = seeded().await;
        assert!(matches!(
            service.buyback().await,
            Err(LedgerError::InsufficientRevenue { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_producers_serialize() {
        let service = Arc::new(seeded().await);
        service.accrue(0).await.unwrap();

        let mut handles = Vec::new();
        for i in 1..=16u64 {
            let s = service.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    s.accrue(i * 60).await.map(|_| ())
                } else {
                    s.set_collateral_price(145_500_000_000 - i as u128).await
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(conservation_ok(&service.ledger().await));
    }
}
