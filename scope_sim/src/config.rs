//! Simulation configuration.
//!
//! Loaded from `sim_config.json` with support for an environment variable
//! override; every field defaults so partial documents load cleanly.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::dvfs::DvfsParams;

pub const BUILTIN_SIM_CONFIG: &str = include_str!("data/sim_config.json");

pub const CONFIG_ENV_VAR: &str = "CHIPSCOPE_CONFIG_PATH";

/// Root configuration for the simulation core.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub tick_interval_ms: u32,
    pub utilization_pct: u32,
    pub voltage_mv: u32,
    pub seed: u64,
    pub preset: String,
    pub scene: SceneConfig,
    pub frame_skip: FrameSkipConfig,
    pub dvfs: DvfsParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            utilization_pct: 70,
            voltage_mv: 1050,
            seed: 0x5eed,
            preset: "compact_demo".to_string(),
            scene: SceneConfig::default(),
            frame_skip: FrameSkipConfig::default(),
            dvfs: DvfsParams::default(),
        }
    }
}

/// 2-D scene dimensions and insets.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub cluster_inset: f32,
    pub sub_unit_inset: f32,
    pub lane_inset: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 900.0,
            margin: 20.0,
            cluster_inset: 6.0,
            sub_unit_inset: 4.0,
            lane_inset: 1.0,
        }
    }
}

/// Lane-count bands for the color-refresh frame-skip policy.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(default)]
pub struct FrameSkipConfig {
    /// Scenes at or below this lane count refresh colors every tick.
    pub full_rate_max_lanes: usize,
    /// Scenes at or below this lane count refresh every 2nd tick; larger
    /// scenes refresh every 3rd.
    pub half_rate_max_lanes: usize,
}

impl Default for FrameSkipConfig {
    fn default() -> Self {
        Self {
            full_rate_max_lanes: 6000,
            half_rate_max_lanes: 12000,
        }
    }
}

impl FrameSkipConfig {
    pub fn skip_factor(&self, total_lanes: usize) -> u32 {
        if total_lanes <= self.full_rate_max_lanes {
            1
        } else if total_lanes <= self.half_rate_max_lanes {
            2
        } else {
            3
        }
    }
}

impl SimConfig {
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_SIM_CONFIG).expect("builtin sim config should parse")
    }

    pub fn from_json_str(json: &str) -> Result<Self, SimConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SimConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| SimConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

#[derive(Debug, Error)]
pub enum SimConfigError {
    #[error("failed to parse sim config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read sim config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load configuration from the environment override if present, falling
/// back to the builtin document.
pub fn load_sim_config_from_env() -> SimConfig {
    if let Some(path) = env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from) {
        match SimConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "chipscope::config",
                    path = %path.display(),
                    "sim_config.loaded=file"
                );
                return config;
            }
            Err(err) => {
                tracing::warn!(
                    target: "chipscope::config",
                    path = %path.display(),
                    error = %err,
                    "sim_config.load_failed"
                );
            }
        }
    }

    tracing::info!(target: "chipscope::config", "sim_config.loaded=builtin");
    SimConfig::builtin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_parses() {
        let config = SimConfig::builtin();
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.preset, "compact_demo");
    }

    #[test]
    fn partial_document_defaults_the_rest() {
        let config = SimConfig::from_json_str("{\"utilization_pct\": 40}").expect("parses");
        assert_eq!(config.utilization_pct, 40);
        assert_eq!(config.voltage_mv, 1050);
        assert_eq!(config.dvfs, DvfsParams::default());
    }

    #[test]
    fn skip_factor_bands() {
        let bands = FrameSkipConfig::default();
        assert_eq!(bands.skip_factor(384), 1);
        assert_eq!(bands.skip_factor(6000), 1);
        assert_eq!(bands.skip_factor(6001), 2);
        assert_eq!(bands.skip_factor(12000), 2);
        assert_eq!(bands.skip_factor(12001), 3);
    }
}
