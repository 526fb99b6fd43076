//! # Engine Configuration
//!
//! Runtime parameters for a [`BasketEngine`](crate::BasketEngine). Protocol
//! constants that must never change per deployment live in
//! [`ecobasket_protocol::config`]; everything an operator may tune lives
//! here.
//!
//! Configuration is plain serde data. Missing fields fall back to
//! [`EngineConfig::default`], so a JSON file only needs the values that
//! differ:
//!
//! ```text
//! { "authority": "regen1gov...", "fee_collector": "regen1fees...", "default_fee_bps": 100 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ecobasket_protocol::config::{
    DEFAULT_PAGE_LIMIT, MAX_DEPOSIT_ENTRIES, MAX_FEE_BPS, MAX_PAGE_LIMIT,
};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunable engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// The only identity allowed to create baskets or change their
    /// criteria, fee, or auto-retire flag.
    pub authority: String,

    /// Account that receives basket tokens minted as deposit fees.
    pub fee_collector: String,

    /// Fee rate for baskets that do not set their own.
    pub default_fee_bps: u16,

    /// Maximum `(batch, amount)` entries accepted in a single deposit.
    pub max_deposit_entries: usize,

    /// Page size used when a query passes `limit = 0`.
    pub default_page_limit: u64,

    /// Hard ceiling on page size.
    pub max_page_limit: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            authority: "gov".to_string(),
            fee_collector: "fee-collector".to_string(),
            default_fee_bps: 0,
            max_deposit_entries: MAX_DEPOSIT_ENTRIES,
            default_page_limit: DEFAULT_PAGE_LIMIT,
            max_page_limit: MAX_PAGE_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Checks that every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.authority.trim().is_empty() {
            return Err(ConfigError::Invalid("authority must not be empty".into()));
        }
        if self.fee_collector.trim().is_empty() {
            return Err(ConfigError::Invalid("fee_collector must not be empty".into()));
        }
        if self.default_fee_bps > MAX_FEE_BPS {
            return Err(ConfigError::Invalid(format!(
                "default_fee_bps {} exceeds {}",
                self.default_fee_bps, MAX_FEE_BPS
            )));
        }
        if self.max_deposit_entries == 0 {
            return Err(ConfigError::Invalid("max_deposit_entries must be positive".into()));
        }
        if self.default_page_limit == 0 || self.default_page_limit > self.max_page_limit {
            return Err(ConfigError::Invalid(format!(
                "default_page_limit {} must be in 1..={}",
                self.default_page_limit, self.max_page_limit
            )));
        }
        Ok(())
    }

    /// Resolves a requested page size: 0 means the default, anything larger
    /// than the maximum is capped.
    pub fn page_limit(&self, requested: u64) -> u64 {
        match requested {
            0 => self.default_page_limit,
            n => n.min(self.max_page_limit),
        }
    }
}
