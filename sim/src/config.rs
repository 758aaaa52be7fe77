//! Simulation configuration.

use std::{fs, io, path::Path, path::PathBuf};

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::GridBounds;

/// Configuration for the simulation and its indices.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Grid height in cells.
    pub rows: u32,
    /// Grid width in cells.
    pub cols: u32,
    /// Bucket width of the hazard-center spatial hash table, in cells.
    pub spatial_bucket_width: u32,
    /// Expected number of resource cells the membership filter is sized for.
    pub bloom_expected_items: usize,
    /// Designed false-positive rate of the membership filter.
    pub bloom_false_positive_rate: f64,
    /// Distance kept between a relocated hazard's extent and the grid edge.
    pub relocation_margin: u32,
    /// Random centers tried before a relocation is skipped for the tick.
    pub relocation_attempts: u32,
    /// Seed for map generation and hazard relocation.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: 50,
            cols: 50,
            spatial_bucket_width: 5,
            bloom_expected_items: 256,
            bloom_false_positive_rate: 0.01,
            relocation_margin: 2,
            relocation_attempts: 100,
            seed: 0,
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.rows, self.cols)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must have at least one cell, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.spatial_bucket_width == 0 {
            return Err(ConfigError::Invalid(
                "spatial_bucket_width must be at least 1".to_string(),
            ));
        }
        if !(self.bloom_false_positive_rate > 0.0 && self.bloom_false_positive_rate < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "bloom_false_positive_rate must be in (0, 1), got {}",
                self.bloom_false_positive_rate
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read simulation config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid simulation config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimConfig::from_json_str(r#"{ "rows": 5, "cols": 7, "seed": 9 }"#)
            .expect("config parses");
        assert_eq!(config.bounds(), GridBounds::new(5, 7));
        assert_eq!(config.seed, 9);
        assert_eq!(config.spatial_bucket_width, 5);
        assert_eq!(config.relocation_attempts, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SimConfig::from_json_str(r#"{ "rows": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SimConfig::from_json_str(r#"{ "bloom_false_positive_rate": 1.5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SimConfig::from_json_str("{ rows: 5 }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SimConfig::from_file(Path::new("/nonexistent/rescue_sim.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
