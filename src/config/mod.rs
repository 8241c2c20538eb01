//! Tracker Configuration Module
//!
//! Operator-tunable settings loaded from TOML. Unlike thresholds baked into
//! code, everything here can be adjusted per deployment without a rebuild.
//!
//! ## Loading Order
//!
//! 1. `MUDLAG_CONFIG` environment variable (path to TOML file)
//! 2. `mudlag.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded value is passed to whoever needs it — there is no process
//! global; the tracking session owns its configuration.

pub mod validation;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::DEFAULT_PUMP_COEFFICIENT;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a tracking session.
///
/// Load with [`TrackerConfig::load`], which searches:
/// 1. `$MUDLAG_CONFIG` env var
/// 2. `./mudlag.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Well / rig identification
    #[serde(default)]
    pub well: WellInfo,

    /// Countdown engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Data file locations
    #[serde(default)]
    pub files: FilesConfig,
}

/// Well / rig identification, used only for logging context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellInfo {
    #[serde(default = "default_well_name")]
    pub name: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub rig: String,
}

fn default_well_name() -> String {
    "unnamed-well".to_string()
}

impl Default for WellInfo {
    fn default() -> Self {
        Self {
            name: default_well_name(),
            field: String::new(),
            rig: String::new(),
        }
    }
}

/// Countdown engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Poll interval for advancing countdowns (seconds)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,

    /// Pump capacity coefficient (bbl/stroke) used when a parameter table
    /// does not carry its own
    #[serde(default = "default_pump_coefficient")]
    pub pump_coefficient: f64,
}

fn default_tick_interval() -> u64 {
    1
}

fn default_pump_coefficient() -> f64 {
    DEFAULT_PUMP_COEFFICIENT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            pump_coefficient: default_pump_coefficient(),
        }
    }
}

/// Data file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Directory of per-sample parameter tables
    #[serde(default = "default_params_dir")]
    pub params_dir: PathBuf,

    /// Directory of per-sample append-only result tables
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_params_dir() -> PathBuf {
    PathBuf::from("data/params")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("data/results")
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            params_dir: default_params_dir(),
            results_dir: default_results_dir(),
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl TrackerConfig {
    /// Load configuration using the standard search order.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("MUDLAG_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), well = %config.well.name, "Loaded config from MUDLAG_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from MUDLAG_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "MUDLAG_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("mudlag.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(well = %config.well.name, "Loaded config from ./mudlag.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./mudlag.toml, using defaults");
                }
            }
        }

        info!("No mudlag.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys and suspicious values produce warnings, never errors —
    /// an existing config keeps working after a schema change.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for w in validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents)?;

        for w in validation::validate_physical_ranges(&config) {
            warn!("{}", w);
        }

        Ok(config)
    }
}
