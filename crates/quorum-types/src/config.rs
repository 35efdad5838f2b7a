//! Configuration management for quorum
//!
//! Chain parameters, node endpoint and multisig deposit settings live in a
//! single TOML file instead of being hardcoded in the builders.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error:: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml parsing error:: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("toml serialization error:: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid configuration value:: {0}")]
    InvalidValue(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chain: ChainConfig,
    pub client: ClientConfig,
    pub multisig: MultisigConfig,
}

/// Chain-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// SS58 network format used when displaying addresses
    pub ss58_format: u16,
    /// Mortal era length requested for new transactions
    pub era_period: u64,
    /// Signing payloads longer than this are signed by hash
    pub payload_hash_threshold: usize,
    /// Call schema file (JSON or TOML); the built-in table is used when unset
    pub schema_path: Option<PathBuf>,
}

/// Node connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub node_url: String,
    pub timeout_seconds: u64,
}

/// Multisig pallet parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultisigConfig {
    /// Fixed part of the deposit reserved from the depositor
    pub deposit_base: u64,
    /// Additional deposit per unit of threshold
    pub deposit_factor: u64,
    /// Weight budget passed with the executing call
    pub max_weight: u64,
    /// Whether the call body is stored on chain with the first approval
    pub store_call: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            ss58_format: crate::POLKADOT_SS58_FORMAT,
            era_period: 64,
            payload_hash_threshold: 256,
            schema_path: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            node_url: "http://localhost:9933".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for MultisigConfig {
    fn default() -> Self {
        Self {
            deposit_base: 200_880_000_000,
            deposit_factor: 320_000_000,
            max_weight: 100_000_000_000,
            store_call: false,
        }
    }
}

impl MultisigConfig {
    /// Deposit reserved for a pending call with the given threshold
    pub fn deposit_for(&self, threshold: u16) -> u128 {
        self.deposit_base as u128 + self.deposit_factor as u128 * threshold as u128
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(".quorum"),
            None => PathBuf::from(".quorum"),
        }
    }

    /// Get default configuration file path
    pub fn default_config_file() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Load configuration from default location or fall back to defaults
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::default_config_file();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.ss58_format > 16383 {
            return Err(ConfigError::InvalidValue(format!(
                "chain.ss58_format {} exceeds 16383",
                self.chain.ss58_format
            )));
        }
        if !(4..=65536).contains(&self.chain.era_period) {
            return Err(ConfigError::InvalidValue(format!(
                "chain.era_period {} outside 4..=65536",
                self.chain.era_period
            )));
        }
        if self.client.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "client.timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Set a configuration value by dotted key
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{key} = {value}")))
        }

        match key {
            "chain.ss58_format" => self.chain.ss58_format = parse(key, value)?,
            "chain.era_period" => self.chain.era_period = parse(key, value)?,
            "chain.payload_hash_threshold" => {
                self.chain.payload_hash_threshold = parse(key, value)?
            }
            "chain.schema_path" => self.chain.schema_path = Some(PathBuf::from(value)),
            "client.node_url" => self.client.node_url = value.to_string(),
            "client.timeout_seconds" => self.client.timeout_seconds = parse(key, value)?,
            "multisig.deposit_base" => self.multisig.deposit_base = parse(key, value)?,
            "multisig.deposit_factor" => self.multisig.deposit_factor = parse(key, value)?,
            "multisig.max_weight" => self.multisig.max_weight = parse(key, value)?,
            "multisig.store_call" => self.multisig.store_call = parse(key, value)?,
            _ => {
                return Err(ConfigError::InvalidValue(format!(
                    "unknown configuration key:: {key}"
                )))
            }
        }
        self.validate()
    }
}
