use anyhow::{Context, Result};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Largest board that fits a wide terminal: each cell takes two columns, so
/// 64 cells need 130 columns with the border
pub const MAX_GRID_SIZE: usize = 64;

/// Configuration for a game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Width and height of the square board, in cells
    pub grid_size: usize,
    /// Time between ticks; only the driver reads this
    pub tick_interval_ms: u64,
    /// Seed for food placement; `None` draws one from the OS
    pub seed: Option<u64>,
}

/// A configuration value outside its allowed range
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ConfigError {
    #[display("grid size must be between 1 and {}, got {}", MAX_GRID_SIZE, _0)]
    GridSize(#[error(not(source))] usize),
    #[display("tick interval must be positive")]
    TickInterval,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 20,
            tick_interval_ms: 140,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Create a new configuration with custom grid size
    pub fn new(grid_size: usize) -> Self {
        Self {
            grid_size,
            ..Default::default()
        }
    }

    /// Create a small grid for testing
    pub fn small() -> Self {
        Self::new(10)
    }

    /// Create a large grid
    pub fn large() -> Self {
        Self::new(30)
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 || self.grid_size > MAX_GRID_SIZE {
            return Err(ConfigError::GridSize(self.grid_size));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::TickInterval);
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: GameConfig =
            serde_json::from_str(&json).context("Failed to parse config")?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {:?}", path))?;
        Ok(config)
    }
}
