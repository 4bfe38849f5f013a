//! Tunable analysis settings, persisted as JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::AudioConfig;
use crate::image_proc::{CentroidConfig, GaussianFitConfig, PeakFinderConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every tunable of the analysis pipeline.
///
/// Missing sections or fields in a config file fall back to their defaults,
/// so a file only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotlabConfig {
    pub centroid: CentroidConfig,
    pub gaussian_fit: GaussianFitConfig,
    pub peaks: PeakFinderConfig,
    pub audio: AudioConfig,
}

impl SpotlabConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_proc::EdgeMode;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spotlab.json");

        let mut config = SpotlabConfig::default();
        config.centroid.lower = 200;
        config.centroid.edge_mode = EdgeMode::canny();
        config.peaks.exclusion_half_size = 4;
        config.audio.max_frequency_hz = 880.0;

        config.save_to_file(&path).unwrap();
        let loaded = SpotlabConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "peaks": { "threshold_factor": 5.0 } }"#).unwrap();

        let loaded = SpotlabConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.peaks.threshold_factor, 5.0);
        assert_eq!(loaded.peaks.exclusion_half_size, 10);
        assert_eq!(loaded.centroid, CentroidConfig::default());
        assert_eq!(loaded.audio.sample_rate, 44_100);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SpotlabConfig::load_from_file(&dir.path().join("nope.json")),
            Err(ConfigError::Io(_))
        ));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SpotlabConfig::load_from_file(&path),
            Err(ConfigError::Json(_))
        ));
    }
}
