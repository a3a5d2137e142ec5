//! Engine configuration storage
//!
//! Handles loading and saving `config.json` from a data directory.
//! Every section falls back to its defaults, so partial files load.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::constants::{defaults, storage};

/// Undo/redo retention settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undo snapshots (values below 1 act as 1)
    #[serde(default = "default_history_limit")]
    pub max_snapshots: usize,
}

fn default_history_limit() -> usize {
    defaults::HISTORY_LIMIT
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_snapshots: default_history_limit(),
        }
    }
}

/// Timing of the simulated per-node work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_base_latency")]
    pub base_latency_ms: u64,
    #[serde(default = "default_jitter")]
    pub jitter_ms: u64,
}

fn default_base_latency() -> u64 {
    defaults::BASE_LATENCY_MS
}

fn default_jitter() -> u64 {
    defaults::JITTER_MS
}

impl SimulationConfig {
    /// No latency at all; steps complete on the next scheduler turn
    pub fn instant() -> Self {
        Self {
            base_latency_ms: 0,
            jitter_ms: 0,
        }
    }

    /// Smallest latency a step can take
    pub fn min_latency(&self) -> Duration {
        Duration::from_millis(self.base_latency_ms)
    }

    /// Largest latency a step can take
    pub fn max_latency(&self) -> Duration {
        Duration::from_millis(self.base_latency_ms.saturating_add(self.jitter_ms))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_latency_ms: default_base_latency(),
            jitter_ms: default_jitter(),
        }
    }
}

/// Where the workflow is persisted inside the data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_workflow_file")]
    pub file_name: String,
}

fn default_workflow_file() -> String {
    storage::WORKFLOW_FILE.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            file_name: default_workflow_file(),
        }
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load configuration from disk
    pub async fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = data_dir.join(storage::CONFIG_FILE);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path).await.map_err(ConfigError::Io)?;

        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, data_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(data_dir).await.map_err(ConfigError::Io)?;

        let config_path = data_dir.join(storage::CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(&config_path, contents).await.map_err(ConfigError::Io)?;

        log::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
