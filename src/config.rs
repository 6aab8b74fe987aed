//! Runtime configuration for the agents
//!
//! Each section has a `Default`, a `validate()`, and a `from_env()` overlay
//! that only touches the fields whose variable is set.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::experiment::ExperimentConfig;
use crate::{Error, Result};

/// Default location of the persisted retention model.
pub const DEFAULT_MODEL_PATH: &str = "/tmp/retention_model.json";

/// Default retention cutoff separating the `low` risk tier.
pub const DEFAULT_RETENTION_THRESHOLD: f64 = 0.65;

/// Read and parse an environment variable.
///
/// Returns `Ok(None)` if the variable is unset or blank.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the variable is set but does not parse.
pub fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::InvalidInput(format!("{name}={raw:?}: {e}"))),
        _ => Ok(None),
    }
}

/// Retention predictor configuration.
///
/// # Example
/// ```
/// use engagement_lab::config::RetentionConfig;
///
/// let config = RetentionConfig::default();
/// assert_eq!(config.retention_threshold, 0.65);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Where the model artifact is loaded from and saved to
    pub model_path: PathBuf,

    /// Estimates at or above this are `low` risk
    pub retention_threshold: f64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            retention_threshold: DEFAULT_RETENTION_THRESHOLD,
        }
    }
}

impl RetentionConfig {
    /// Overlay `MODEL_PATH` and `RETENTION_THRESHOLD`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a variable is set but unparsable.
    pub fn from_env(mut self) -> Result<Self> {
        if let Some(path) = env_parse::<PathBuf>("MODEL_PATH")? {
            self.model_path = path;
        }
        if let Some(threshold) = env_parse::<f64>("RETENTION_THRESHOLD")? {
            self.retention_threshold = threshold;
        }
        Ok(self)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the threshold is outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.retention_threshold) {
            return Err(Error::InvalidInput(format!(
                "retention_threshold must be in [0, 1], got {}",
                self.retention_threshold
            )));
        }
        Ok(())
    }
}

/// Configuration for both agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Experiment manager settings
    pub experiment: ExperimentConfig,
    /// Retention predictor settings
    pub retention: RetentionConfig,
}

impl AgentConfig {
    /// Defaults overlaid with the environment, then validated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unparsable or out-of-range values.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            experiment: ExperimentConfig::default().from_env()?,
            retention: RetentionConfig::default().from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first section's validation error.
    pub fn validate(&self) -> Result<()> {
        self.experiment.validate()?;
        self.retention.validate()
    }
}
