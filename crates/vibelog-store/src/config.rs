use serde::{Deserialize, Serialize};

use crate::atomic::{read_json, write_json};
use crate::error::{Result, StoreError};
use crate::paths::VibelogPaths;

pub const CONFIG_VERSION: u32 = 1;

/// Network served by the bundled file-backed ledger.
pub const LOCAL_NETWORK: &str = "local";

/// Aggregate counters kept alongside the watermark.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    #[serde(default)]
    pub total_logs: u64,
    #[serde(default)]
    pub total_checkpoints: u64,
    #[serde(default)]
    pub total_gas_used: u64,
    #[serde(default)]
    pub total_cost: f64,
}

/// Submission throttle applied in front of the ledger gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_submissions: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_submissions: 10,
            window_secs: 60,
        }
    }
}

/// Optional wait for a cheaper fee window before submitting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gas_price_gwei: Option<u64>,
    pub wait_timeout_secs: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            max_gas_price_gwei: None,
            wait_timeout_secs: 60,
        }
    }
}

/// Contents of `.vibelog/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VibeConfig {
    pub version: u32,
    /// Ledger subject key the checkpoints are attested under.
    pub subject: String,
    pub network: String,
    pub initialized: String,
    /// Watermark: logs with a later timestamp are pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checkpoint: Option<u64>,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub fee: FeeConfig,
}

impl VibeConfig {
    pub fn new(subject: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            version: CONFIG_VERSION,
            subject: subject.into(),
            network: network.into(),
            initialized: vibelog_core::clock::now_rfc3339(),
            last_checkpoint: None,
            stats: Stats::default(),
            rate_limit: RateLimitConfig::default(),
            fee: FeeConfig::default(),
        }
    }

    pub fn watermark(&self) -> u64 {
        self.last_checkpoint.unwrap_or(0)
    }

    /// Move the watermark forward; never backwards.
    pub fn advance_watermark(&mut self, cutoff: u64) {
        self.last_checkpoint = Some(cutoff.max(self.watermark()));
    }

    /// Apply `VIBELOG_SUBJECT` / `VIBELOG_NETWORK` without persisting them.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(subject) = std::env::var("VIBELOG_SUBJECT") {
            if !subject.trim().is_empty() {
                self.subject = subject;
            }
        }
        if let Ok(network) = std::env::var("VIBELOG_NETWORK") {
            if !network.trim().is_empty() {
                self.network = network;
            }
        }
        self
    }
}

pub fn load_config(paths: &VibelogPaths) -> Result<VibeConfig> {
    if !paths.is_initialized() {
        return Err(StoreError::NotInitialized(paths.root.clone()));
    }
    read_json(&paths.config_json)
}

pub fn save_config(paths: &VibelogPaths, config: &VibeConfig) -> Result<()> {
    write_json(&paths.config_json, config)
}
