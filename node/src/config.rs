//! Generator configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use delos_types::ChainId;

use crate::GeneratorError;

/// Configuration for the forging core.
///
/// Can be loaded from a TOML file via [`GeneratorConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Hex-encoded 4-byte chain id, mixed into every block signature.
    #[serde(default = "default_chain_id")]
    pub chain_id: String,

    /// Data directory for the generator store.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Keys file imported into the generator store at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys_file: Option<PathBuf>,

    /// Seconds to wait into a slot for a missing previous block before
    /// producing anyway. A network-wide constant.
    #[serde(default = "default_wait_threshold")]
    pub forging_wait_threshold_secs: u64,

    /// Polling interval of the generation loop.
    #[serde(default = "default_generation_interval_ms")]
    pub generation_interval_ms: u64,

    /// Flush interval of the transaction-announcement broadcaster.
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,

    /// Maximum number of ids per announcement.
    #[serde(default = "default_broadcast_limit")]
    pub broadcast_limit: usize,

    /// Byte budget for the transactions of one block.
    #[serde(default = "default_max_transactions_size")]
    pub max_transactions_size: u64,

    /// Attempts to pull pooled transactions from peers on start.
    #[serde(default = "default_load_transactions_retries")]
    pub load_transactions_retries: u32,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_chain_id() -> String {
    ChainId::DEVNET.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./delos_data")
}

fn default_wait_threshold() -> u64 {
    2
}

fn default_generation_interval_ms() -> u64 {
    1_000
}

fn default_broadcast_interval_ms() -> u64 {
    5_000
}

fn default_broadcast_limit() -> usize {
    25
}

fn default_max_transactions_size() -> u64 {
    15 * 1024
}

fn default_load_transactions_retries() -> u32 {
    5
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl GeneratorConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, GeneratorError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| GeneratorError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, GeneratorError> {
        let config: Self = toml::from_str(s).map_err(|e| GeneratorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("GeneratorConfig is always serializable to TOML")
    }

    pub fn validate(&self) -> Result<(), GeneratorError> {
        self.chain_id()?;
        if self.broadcast_limit == 0 {
            return Err(GeneratorError::Config("broadcast_limit must be positive".into()));
        }
        if self.generation_interval_ms == 0 || self.broadcast_interval_ms == 0 {
            return Err(GeneratorError::Config("intervals must be positive".into()));
        }
        Ok(())
    }

    pub fn chain_id(&self) -> Result<ChainId, GeneratorError> {
        ChainId::from_str(&self.chain_id).map_err(|e| GeneratorError::Config(e.to_string()))
    }

    pub fn generation_interval(&self) -> Duration {
        Duration::from_millis(self.generation_interval_ms)
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis(self.broadcast_interval_ms)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            data_dir: default_data_dir(),
            keys_file: None,
            forging_wait_threshold_secs: default_wait_threshold(),
            generation_interval_ms: default_generation_interval_ms(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            broadcast_limit: default_broadcast_limit(),
            max_transactions_size: default_max_transactions_size(),
            load_transactions_retries: default_load_transactions_retries(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
