//! Experiment configuration

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Smallest number of variants an experiment may carry.
pub const MIN_VARIANTS: usize = 2;
/// Largest number of variants an experiment may carry.
pub const MAX_VARIANTS: usize = 4;

/// Configuration for an A/B experiment and its winner selection.
///
/// # Example
/// ```
/// use engagement_lab::experiment::ExperimentConfig;
///
/// let config = ExperimentConfig::default();
/// assert_eq!(config.confidence_threshold, 0.95);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of variants to generate (2..=4)
    pub variant_count: usize,

    /// How long the experiment runs before analysis
    pub test_duration_minutes: u32,

    /// Metrics collected per variant
    pub success_metrics: Vec<String>,

    /// Challengers with fewer observations are never tested
    pub minimum_sample_size: u64,

    /// Minimum `1 - p` for a challenger to be declared winner
    pub confidence_threshold: f64,

    /// Name the highest raw rate when nothing is significant
    ///
    /// The fallback winner carries [`DecisionKind::BestPerformer`] so callers
    /// can tell it apart from a validated one.
    ///
    /// [`DecisionKind::BestPerformer`]: super::DecisionKind::BestPerformer
    pub fallback_to_best_performer: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            variant_count: 3,
            test_duration_minutes: 120,
            success_metrics: vec![
                "engagement_rate".to_string(),
                "completion_rate".to_string(),
                "share_rate".to_string(),
            ],
            minimum_sample_size: 100,
            confidence_threshold: 0.95,
            fallback_to_best_performer: true,
        }
    }
}

impl ExperimentConfig {
    /// Stricter preset: 99% confidence, larger samples, no fallback winner.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            minimum_sample_size: 500,
            confidence_threshold: 0.99,
            fallback_to_best_performer: false,
            ..Self::default()
        }
    }

    /// Default configuration with `variant_count` clamped into range.
    #[must_use]
    pub fn with_variant_count(requested: usize) -> Self {
        Self {
            variant_count: requested.clamp(MIN_VARIANTS, MAX_VARIANTS),
            ..Self::default()
        }
    }

    /// Overlay values from the environment.
    ///
    /// Reads `EXPERIMENT_MIN_SAMPLE_SIZE` and `EXPERIMENT_CONFIDENCE_THRESHOLD`;
    /// unset variables leave the current value untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a variable is set but unparsable.
    pub fn from_env(mut self) -> Result<Self> {
        if let Some(v) = crate::config::env_parse::<u64>("EXPERIMENT_MIN_SAMPLE_SIZE")? {
            self.minimum_sample_size = v;
        }
        if let Some(v) = crate::config::env_parse::<f64>("EXPERIMENT_CONFIDENCE_THRESHOLD")? {
            self.confidence_threshold = v;
        }
        Ok(self)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_VARIANTS..=MAX_VARIANTS).contains(&self.variant_count) {
            return Err(Error::InvalidInput(format!(
                "variant_count must be in [{MIN_VARIANTS}, {MAX_VARIANTS}], got {}",
                self.variant_count
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::InvalidInput(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        Ok(())
    }
}
