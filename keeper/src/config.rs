//! Keeper configuration

use std::time::Duration;

use anyhow::{bail, Context, Result};
use launchpad_common::{BOOTSTRAP_QUOTE, BPS_SCALE, DEFAULT_FEE_BPS, DEFAULT_MAX_PER_WALLET};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Program id the launch pools are derived under
    #[serde(with = "pubkey_str")]
    pub program_id: Pubkey,

    /// Receives the treasury skim on every trade
    #[serde(with = "pubkey_str")]
    pub treasury: Pubkey,

    /// Order book program the migration market is created on
    #[serde(with = "pubkey_str")]
    pub market_program: Pubkey,

    /// External AMM program the liquidity moves to
    #[serde(with = "pubkey_str")]
    pub amm_program: Pubkey,

    /// Quote side of the migration market (wrapped SOL)
    #[serde(with = "pubkey_str")]
    pub quote_mint: Pubkey,

    /// Quote reserve a pool must reach before it migrates
    pub migration_quote_threshold: u64,

    /// Wait after market creation before reading pool keys
    pub settle_delay_secs: u64,

    pub retry: RetryConfig,
    pub market: MarketConfig,
    pub launch: LaunchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub fee_bps: u16,
    pub max_per_wallet: u64,
}

impl Config {
    /// Load from the TOML file named by `LAUNCHPAD_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("LAUNCHPAD_CONFIG").unwrap_or_else(|_| "launchpad-config.toml".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let config_str = std::fs::read_to_string(expanded.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&config_str).context("Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Settings for a local dry run against the in-memory venue
    pub fn default_local() -> Self {
        Self {
            program_id: Pubkey::new_from_array(*b"launchpad-amm-program-id-0000000"),
            treasury: Pubkey::new_from_array(*b"launchpad-treasury-0000000000000"),
            market_program: pubkey!("srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX"),
            amm_program: pubkey!("675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8"),
            quote_mint: pubkey!("So11111111111111111111111111111111111111112"),
            migration_quote_threshold: BOOTSTRAP_QUOTE,
            settle_delay_secs: 60,
            retry: RetryConfig {
                max_attempts: 5,
                delay_ms: 2_000,
            },
            market: MarketConfig {
                base_lot_size: 1,
                quote_lot_size: 1,
            },
            launch: LaunchConfig {
                fee_bps: DEFAULT_FEE_BPS,
                max_per_wallet: DEFAULT_MAX_PER_WALLET,
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        if self.market.base_lot_size == 0 || self.market.quote_lot_size == 0 {
            bail!("market lot sizes must be non-zero");
        }
        if u64::from(self.launch.fee_bps) >= BPS_SCALE {
            bail!("launch.fee_bps must be below {}", BPS_SCALE);
        }
        if self.launch.max_per_wallet == 0 {
            bail!("launch.max_per_wallet must be non-zero");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.retry.max_attempts, Duration::from_millis(self.retry.delay_ms))
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Write the local defaults to `path`
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_local();
        let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;

        std::fs::write(path, toml_str).with_context(|| format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }
}

/// Base58 strings in the file, `Pubkey` in memory
mod pubkey_str {
    use std::str::FromStr;

    use serde::{de, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(de::Error::custom)
    }
}
