//! Configuration management for powledger

use crate::error::{ChainError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Lower bound on attempts between two mining progress checkpoints.
pub const MIN_PROGRESS_INTERVAL: u64 = 200;
/// Upper bound on attempts between two mining progress checkpoints.
pub const MAX_PROGRESS_INTERVAL: u64 = 1000;

/// Engine parameters. `difficulty` and `reward` are read by each `mine` call,
/// so changing them only affects blocks mined afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_reward")]
    pub reward: f64,
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    #[serde(default = "default_progress_channel_capacity")]
    pub progress_channel_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            reward: default_reward(),
            progress_interval: default_progress_interval(),
            progress_channel_capacity: default_progress_channel_capacity(),
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_PROGRESS_INTERVAL..=MAX_PROGRESS_INTERVAL).contains(&self.progress_interval) {
            return Err(ChainError::Config(format!(
                "progress_interval must be between {} and {}, got {}",
                MIN_PROGRESS_INTERVAL, MAX_PROGRESS_INTERVAL, self.progress_interval
            )));
        }

        if !self.reward.is_finite() || self.reward < 0.0 {
            return Err(ChainError::Config(format!(
                "reward must be a non-negative number, got {}",
                self.reward
            )));
        }

        if self.progress_channel_capacity == 0 {
            return Err(ChainError::Config(
                "progress_channel_capacity must be at least 1".to_string(),
            ));
        }

        // Hex digests are 64 characters; anything longer can never be satisfied.
        if self.difficulty > 64 {
            return Err(ChainError::Config(format!(
                "difficulty must be at most 64, got {}",
                self.difficulty
            )));
        }

        Ok(())
    }
}

/// Loads the config from `path`, falling back to defaults when the file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<LedgerConfig> {
    let path = path.as_ref();
    let config = if path.exists() {
        let config_str = fs::read_to_string(path)?;
        toml::from_str(&config_str)?
    } else {
        tracing::debug!("{} not found, using default ledger config", path.display());
        LedgerConfig::default()
    };

    config.validate()?;
    Ok(config)
}

fn default_difficulty() -> u32 {
    2
}

fn default_reward() -> f64 {
    100.0
}

fn default_progress_interval() -> u64 {
    500
}

fn default_progress_channel_capacity() -> usize {
    64
}
