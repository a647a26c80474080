//! Configuration System
//!
//! Loads tuning parameters from a TOML file so odds and penalties can be
//! adjusted without recompiling. Every section falls back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "turf.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub influence: InfluenceConfig,
    #[serde(default)]
    pub penalties: PenaltyConfig,
    #[serde(default)]
    pub conflict: ConflictConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Run parameters for the CLI driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub default_seed: u64,
    pub default_turns: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            default_seed: 42,
            default_turns: 4,
        }
    }
}

/// Decay odds and control-DC terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceConfig {
    /// Chance each unprotected point is lost per turn
    pub decay_chance: f64,
    pub protected_threshold: i32,
    pub stronghold_protected_threshold: i32,
    /// Extra loss chance when the district is full (10/10)
    pub saturated_loss_chance: f64,
    /// Extra loss chance at 9/10
    pub near_saturated_loss_chance: f64,
    pub control_dc_base: i32,
    pub control_dc_floor: i32,
    pub stronghold_dc_bonus: i32,
    /// Added when the action targets another faction's influence
    pub targeted_dc_surcharge: i32,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        Self {
            decay_chance: 0.05,
            protected_threshold: 2,
            stronghold_protected_threshold: 5,
            saturated_loss_chance: 0.35,
            near_saturated_loss_chance: 0.10,
            control_dc_base: 11,
            control_dc_floor: 5,
            stronghold_dc_bonus: 2,
            targeted_dc_surcharge: 3,
        }
    }
}

/// Enemy-presence penalties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyConfig {
    pub agent_hot_war: i32,
    pub agent_cold_war: i32,
    pub squadron_hot_war: i32,
    pub squadron_cold_war: i32,
    /// Squadrons below this mobility cannot reach into neighbouring districts
    pub adjacent_min_mobility: i32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            agent_hot_war: 4,
            agent_cold_war: 2,
            squadron_hot_war: 2,
            squadron_cold_war: 1,
            adjacent_min_mobility: 2,
        }
    }
}

/// Conflict trigger odds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    pub cold_war_trigger_chance: f64,
    pub hot_war_trigger_chance: f64,
    /// Join chance per point of squadron mobility
    pub adjacent_join_chance_per_mobility: f64,
    /// Subtracted from a drawing faction's stored roll
    pub draw_penalty: i32,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            cold_war_trigger_chance: 0.10,
            hot_war_trigger_chance: 0.40,
            adjacent_join_chance_per_mobility: 0.10,
            draw_penalty: 2,
        }
    }
}

/// Passive monitoring and rumor parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Minimum influence for a free passive monitoring roll
    pub passive_threshold: i32,
    /// Rumors beaten by at least this margin are discovered outright
    pub rumor_auto_margin: i32,
    pub rumor_dc_floor: i32,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            passive_threshold: 4,
            rumor_auto_margin: 7,
            rumor_dc_floor: 1,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from the default path, or use defaults if it cannot be read
    pub fn load_or_default() -> Self {
        match Self::from_file(DEFAULT_TUNING_PATH) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("could not load {}: {}; using defaults", DEFAULT_TUNING_PATH, e);
                Self::default()
            }
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
