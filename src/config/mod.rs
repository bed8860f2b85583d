//! # Configuration Management Module
//!
//! Centralized configuration for the questledger engine: storage
//! location, per-user lock policy, and the display currency. Loaded from
//! TOML with sensible defaults and validated before use.
//!
//! ```toml
//! [storage]
//! data_dir = "data/questledger"
//!
//! [locking]
//! max_retries = 50
//! backoff_ms = 5
//!
//! [currency]
//! symbol = "₹"
//! decimals = 2
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub locking: LockingConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            locking: LockingConfig::default(),
            currency: CurrencyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the sled database.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data/questledger".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockingConfig {
    /// Per-user lock acquisition attempts before failing with Conflict.
    pub max_retries: u32,
    /// Fixed backoff between attempts, in milliseconds.
    pub backoff_ms: u64,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            max_retries: 50,
            backoff_ms: 5,
        }
    }
}

impl LockingConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Display symbol; the engine itself computes in minor units.
    pub symbol: String,
    /// Minor-unit digits shown by the CLI (0-4).
    pub decimals: u8,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            symbol: "₹".to_string(),
            decimals: 2,
        }
    }
}

impl CurrencyConfig {
    /// Render a minor-unit amount for display, e.g. 1234 -> "₹12.34".
    pub fn format(&self, minor_units: i64) -> String {
        if self.decimals == 0 {
            return format!("{}{}", self.symbol, minor_units);
        }
        let divisor = 10i64.pow(self.decimals as u32);
        let whole = minor_units / divisor;
        let frac = (minor_units % divisor).abs();
        format!(
            "{}{}.{:0width$}",
            self.symbol,
            whole,
            frac,
            width = self.decimals as usize
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter level: error, warn, info, debug, trace.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, applying defaults for any
    /// missing section.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write a default configuration file; refuses to overwrite.
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            bail!("config file already exists: {}", path.display());
        }
        let rendered = toml::to_string_pretty(&Config::default())?;
        std::fs::write(path, rendered)
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            bail!("storage.data_dir must not be empty");
        }
        if self.locking.max_retries == 0 {
            bail!("locking.max_retries must be at least 1");
        }
        if self.locking.backoff_ms > 1000 {
            bail!("locking.backoff_ms must be 1000 or less");
        }
        if self.currency.decimals > 4 {
            bail!("currency.decimals must be 4 or less");
        }
        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            other => bail!("unknown logging.level: {}", other),
        }
        Ok(())
    }
}
