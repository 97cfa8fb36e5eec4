//! Keeper configuration

use anyhow::{bail, Context, Result};
use rei_ledger::math::to_amount;
use rei_ledger::{Amount, Params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Identity recorded as liquidator on receipts
    pub keeper_id: String,

    /// Liquidation sweep interval in seconds
    pub poll_interval_secs: u64,

    /// Fee accrual interval in seconds
    pub accrual_interval_secs: u64,

    /// Index price refresh interval in seconds
    pub price_refresh_secs: u64,

    /// Warning band above the minimum ratio (in bps)
    pub preliq_buffer_bps: u64,

    /// Maximum liquidations per sweep
    pub max_liquidations_per_batch: usize,

    /// Attempt buyback & burn after every sweep
    pub auto_buyback: bool,

    pub protocol: ProtocolConfig,

    pub oracle: OracleConfig,

    /// Accounts opened at startup
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub min_collateral_ratio_bps: u64,
    pub stability_fee_bps: u64,
    pub liquidation_penalty_bps: u64,
    /// Revenue (reference currency) that must be exceeded before a buyback
    pub buyback_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Centre of the simulated index feed
    pub index_price: f64,
    /// Full width of the simulated index noise band
    pub index_jitter: f64,
    pub collateral_price: f64,
    pub governance_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub owner: String,
    /// Custodial collateral balance credited at startup
    pub balance: f64,
    #[serde(default)]
    pub deposit: f64,
    #[serde(default)]
    pub mint: f64,
}

impl Config {
    /// Load configuration from TOML file
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("KEEPER_CONFIG")
            .unwrap_or_else(|_| "keeper-config.toml".to_string());
        let expanded_path = shellexpand::tilde(&config_path);

        let config_str = std::fs::read_to_string(expanded_path.as_ref())
            .context(format!("Failed to read config file: {}", config_path))?;

        Self::parse(&config_str)
    }

    pub fn parse(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str)
            .context("Failed to parse config TOML")?;
        config.protocol.to_params()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_local() -> Self {
        Self {
            keeper_id: "rei-keeper".to_string(),
            poll_interval_secs: 1,
            accrual_interval_secs: 1,
            price_refresh_secs: 5,
            preliq_buffer_bps: 1_000, // warn within 10% of the minimum
            max_liquidations_per_batch: 5,
            auto_buyback: true,
            protocol: ProtocolConfig {
                min_collateral_ratio_bps: 15_000,
                stability_fee_bps: 200,
                liquidation_penalty_bps: 1_000,
                buyback_threshold: 1_000.0,
            },
            oracle: OracleConfig {
                index_price: 49.36,
                index_jitter: 0.5,
                collateral_price: 145.50,
                governance_price: 2.50,
            },
            accounts: vec![AccountSeed {
                owner: "demo".to_string(),
                balance: 50.0,
                deposit: 10.0,
                mint: 15.0,
            }],
        }
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config)
            .context("Failed to serialize config")?;

        std::fs::write(path, toml_str)
            .context(format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }
}

impl ProtocolConfig {
    pub fn to_params(&self) -> Result<Params> {
        let params = Params {
            min_collateral_ratio_bps: self.min_collateral_ratio_bps,
            stability_fee_bps: self.stability_fee_bps,
            liquidation_penalty_bps: self.liquidation_penalty_bps,
            buyback_threshold: decimal("buyback_threshold", self.buyback_threshold)?,
        };
        params.validate().context("Invalid protocol parameters")?;
        Ok(params)
    }
}

/// Convert a configured decimal to a ledger amount
pub fn decimal(field: &str, value: f64) -> Result<Amount> {
    match to_amount(value) {
        Some(amount) => Ok(amount),
        None => bail!("{} must be a non-negative finite number, got {}", field, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rei_ledger::AMOUNT_SCALE;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_local();
        assert_eq!(config.oracle.index_price, 49.36);
        assert_eq!(config.poll_interval_secs, 1);
        assert_eq!(config.accounts.len(), 1);
    }

    #[test]
    fn test_default_params_match_ledger_defaults() {
        let params = Config::default_local().protocol.to_params().unwrap();
        assert_eq!(params, Params::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            keeper_id = "bot-1"
            poll_interval_secs = 2
            accrual_interval_secs = 10
            price_refresh_secs = 5
            preliq_buffer_bps = 500
            max_liquidations_per_batch = 3
            auto_buyback = false

            [protocol]
            min_collateral_ratio_bps = 20000
            stability_fee_bps = 300
            liquidation_penalty_bps = 1300
            buyback_threshold = 250.5

            [oracle]
            index_price = 49.36
            index_jitter = 0.0
            collateral_price = 145.5
            governance_price = 2.5

            [[accounts]]
            owner = "alice"
            balance = 50.0
            deposit = 10.0
        "#;

        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.keeper_id, "bot-1");
        assert_eq!(config.accounts[0].mint, 0.0);

        let params = config.protocol.to_params().unwrap();
        assert_eq!(params.min_collateral_ratio_bps, 20_000);
        assert_eq!(params.buyback_threshold, 250_500_000_000);
    }

    #[test]
    fn test_parse_rejects_invalid_params() {
        let mut config = Config::default_local();
        config.protocol.liquidation_penalty_bps = 20_000;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(Config::parse(&toml_str).is_err());
    }

    #[test]
    fn test_decimal_rejects_negative() {
        assert!(decimal("balance", -1.0).is_err());
        assert_eq!(decimal("balance", 2.5).unwrap(), 5 * AMOUNT_SCALE / 2);
    }
}
