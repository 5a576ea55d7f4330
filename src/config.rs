//! # Analysis Configuration
//!
//! Every run is fully described by an [`AnalysisConfig`]: the population it
//! generates and the hyperparameters of the two learning engines. A config can
//! be read from a TOML file; any section or key left out keeps its default,
//! while unrecognized keys are rejected so a typo never silently falls back.
//!
//! ```toml
//! [population]
//! size = 300
//! seed = 123
//! outcome_noise_std = 5.0
//!
//! [clustering]
//! clusters = 3
//! max_iterations = 15
//!
//! [regression]
//! learning_rate = 0.05
//! iterations = 1200
//! ```

use crate::analyze::kmeans::KMeansConfig;
use crate::analyze::regression::RegressionConfig;
use crate::synth::population::{
    DEFAULT_OUTCOME_NOISE_STD, DEFAULT_POPULATION_SIZE, DEFAULT_SEED, PopulationBuilder,
};
use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

/// Errors raised while loading or checking a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Size, seed and noise level of the generated population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationConfig {
    pub size: usize,
    pub seed: i64,
    pub outcome_noise_std: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_POPULATION_SIZE,
            seed: DEFAULT_SEED,
            outcome_noise_std: DEFAULT_OUTCOME_NOISE_STD,
        }
    }
}

impl PopulationConfig {
    pub fn builder(&self) -> PopulationBuilder {
        PopulationBuilder::new(self.size)
            .seed(self.seed)
            .with_outcome_noise(self.outcome_noise_std)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub population: PopulationConfig,
    pub clustering: KMeansConfig,
    pub regression: RegressionConfig,
}

impl AnalysisConfig {
    /// Reads and validates a TOML configuration file.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&toml_string)?;
        config.validate()?;
        log::debug!("Loaded configuration from {path}: {config:?}");
        Ok(config)
    }

    /// Rejects values the engines cannot run with.
    ///
    /// An empty population and a cluster count of 0 are accepted: the engines
    /// resolve both on their own (empty results and clamping respectively).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let noise = self.population.outcome_noise_std;
        if !noise.is_finite() || noise < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "population.outcome_noise_std",
                reason: format!("must be a finite, non-negative number (got {noise})"),
            });
        }
        let rate = self.regression.learning_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "regression.learning_rate",
                reason: format!("must be a finite, positive number (got {rate})"),
            });
        }
        if self.clustering.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "clustering.max_iterations",
                reason: "at least one assignment pass is required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write temp file");
        file
    }

    fn load(file: &NamedTempFile) -> Result<AnalysisConfig, ConfigError> {
        AnalysisConfig::load(file.path().to_str().expect("utf-8 temp path"))
    }

    #[test]
    fn defaults_match_the_reference_run() {
        let config = AnalysisConfig::default();
        assert_eq!(config.population.size, 300);
        assert_eq!(config.population.seed, 123);
        assert_eq!(config.population.outcome_noise_std, 5.0);
        assert_eq!(config.clustering.clusters, 3);
        assert_eq!(config.clustering.max_iterations, 15);
        assert_eq!(config.regression.learning_rate, 0.05);
        assert_eq!(config.regression.iterations, 1200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let file = write_config("[population]\nseed = -7\n\n[clustering]\nclusters = 5\n");
        let config = load(&file).expect("valid config");
        assert_eq!(config.population.seed, -7);
        assert_eq!(config.population.size, 300);
        assert_eq!(config.clustering.clusters, 5);
        assert_eq!(config.regression, RegressionConfig::default());
    }

    #[test]
    fn empty_file_is_the_default_config() {
        let file = write_config("");
        assert_eq!(load(&file).expect("valid config"), AnalysisConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = write_config("[clustering]\nclusterz = 4\n");
        assert!(matches!(load(&file), Err(ConfigError::TomlParseError(_))));
    }

    #[test]
    fn invalid_values_name_the_field() {
        let file = write_config("[regression]\nlearning_rate = 0.0\n");
        match load(&file) {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "regression.learning_rate")
            }
            other => panic!("expected an invalid value error, got {other:?}"),
        }

        let mut config = AnalysisConfig::default();
        config.population.outcome_noise_std = -1.0;
        assert!(config.validate().is_err());
        config.population.outcome_noise_std = 0.0;
        config.clustering.max_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("absent.toml");
        let result = AnalysisConfig::load(path.to_str().expect("utf-8 temp path"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn population_section_drives_the_generator() {
        let config = PopulationConfig {
            size: 5,
            seed: 42,
            outcome_noise_std: 5.0,
        };
        assert_eq!(
            config.builder().build(),
            crate::synth::population::generate_population(5, 42)
        );
    }
}
