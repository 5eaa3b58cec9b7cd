use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::detector::{DetectorConfig, McLeodConfig};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,
    pub input_device_id: Option<String>,
    /// How often the processor reports status while running live
    pub status_interval_ms: u64,
    /// Seconds of device audio the capture ring buffer can hold
    pub ring_buffer_seconds: u32,
    pub detector: DetectorConfig,
    /// Pitch estimator tuning
    pub pitch: McLeodConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            input_device_id: None,
            status_interval_ms: 1000,
            ring_buffer_seconds: 10,
            detector: DetectorConfig::default(),
            pitch: McLeodConfig::default(),
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {:?}", path))
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file, creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".backchannel"))
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }
}
