//! Retention estimation from a loaded model artifact
//!
//! The estimator is a pure function of its artifact and the input features.
//! The artifact sits behind an `Arc`, so clones are cheap and can be handed
//! to worker threads without locking.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_NAMES};
use super::persistence::ModelArtifact;
use crate::config::DEFAULT_RETENTION_THRESHOLD;
use crate::{Error, Result};

/// Two-sided 95% normal quantile.
const Z_95: f64 = 1.96;

/// Half-width of the interval when the model has no ensemble members.
pub const FALLBACK_INTERVAL_HALF_WIDTH: f64 = 0.1;

/// Width of the `medium` band below the threshold.
const MEDIUM_BAND: f64 = 0.1;

/// Coarse retention risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// At or above the threshold
    Low,
    /// Within 0.1 below the threshold
    Medium,
    /// Further below
    High,
}

impl RiskTier {
    /// Classify `estimate` against `threshold`.
    #[must_use]
    pub fn classify(estimate: f64, threshold: f64) -> Self {
        if estimate >= threshold {
            Self::Low
        } else if estimate >= threshold - MEDIUM_BAND {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Get the tier name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A feature and its share of the model's impurity reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name
    pub feature: String,
    /// Normalized importance
    pub importance: f64,
}

/// Result of one estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionEstimate {
    /// Point estimate in [0, 1]
    pub estimate: f64,
    /// `(lower, upper)`, both in [0, 1], bracketing the estimate
    pub confidence_interval: (f64, f64),
    /// Risk tier for the configured threshold
    pub risk_tier: RiskTier,
    /// Importances, highest first; empty if the model has none
    pub feature_importances: Vec<FeatureImportance>,
}

/// Estimates retention from feature vectors.
///
/// # Example
/// ```
/// use engagement_lab::retention::{ModelArtifact, RetentionEstimator, FeatureVector, FEATURE_COUNT};
///
/// let artifact = ModelArtifact::bootstrap(200, 42).unwrap();
/// let estimator = RetentionEstimator::new(artifact);
///
/// let mut values = [0.0; FEATURE_COUNT];
/// values[0] = 20.0;
/// values[9] = 1.0;
/// let estimate = estimator.estimate(&FeatureVector::new(values).unwrap()).unwrap();
///
/// let (lower, upper) = estimate.confidence_interval;
/// assert!(lower <= estimate.estimate && estimate.estimate <= upper);
/// ```
#[derive(Debug, Clone)]
pub struct RetentionEstimator {
    artifact: Arc<ModelArtifact>,
    threshold: f64,
    importances: Arc<[FeatureImportance]>,
}

impl RetentionEstimator {
    /// Wrap an artifact with the default threshold.
    #[must_use]
    pub fn new(artifact: impl Into<Arc<ModelArtifact>>) -> Self {
        let artifact = artifact.into();
        let importances = ranked_importances(&artifact).into();
        Self {
            artifact,
            threshold: DEFAULT_RETENTION_THRESHOLD,
            importances,
        }
    }

    /// Load an artifact from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotLoaded`] if nothing is at `path`, or the
    /// artifact's validation error.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        ModelArtifact::load(path).map(Self::new)
    }

    /// Use a different risk threshold.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `threshold` is outside [0, 1].
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidInput(format!(
                "retention threshold must be in [0, 1], got {threshold}"
            )));
        }
        self.threshold = threshold;
        Ok(self)
    }

    /// Get the risk threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Get the underlying artifact.
    #[must_use]
    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    /// Estimate retention for one feature vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFormat`] if the model produces a non-finite value.
    pub fn estimate(&self, features: &FeatureVector) -> Result<RetentionEstimate> {
        let scaled = self.artifact.scaler().transform(features.values())?;
        let model = self.artifact.model();

        let raw = model.predict(&scaled);
        if !raw.is_finite() {
            return Err(Error::ModelFormat(format!("model produced {raw}")));
        }
        let estimate = raw.clamp(0.0, 1.0);
        let members = model.member_predictions(&scaled);

        Ok(RetentionEstimate {
            estimate,
            confidence_interval: confidence_interval(estimate, &members),
            risk_tier: RiskTier::classify(estimate, self.threshold),
            feature_importances: self.importances.to_vec(),
        })
    }

    /// Estimate many feature vectors, in parallel when `rayon` is enabled.
    ///
    /// # Errors
    ///
    /// Returns the first estimation error.
    pub fn estimate_batch(&self, batch: &[FeatureVector]) -> Result<Vec<RetentionEstimate>> {
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            batch.par_iter().map(|f| self.estimate(f)).collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            batch.iter().map(|f| self.estimate(f)).collect()
        }
    }
}

/// `estimate ± 1.96·σ` over member outputs, clipped to [0, 1].
///
/// σ is the population standard deviation. With no members the band is a
/// fixed ±0.1.
#[must_use]
pub fn confidence_interval(estimate: f64, members: &[f64]) -> (f64, f64) {
    let half_width = if members.is_empty() {
        FALLBACK_INTERVAL_HALF_WIDTH
    } else {
        Z_95 * population_std(members)
    };
    (
        (estimate - half_width).max(0.0),
        (estimate + half_width).min(1.0),
    )
}

fn population_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

fn ranked_importances(artifact: &ModelArtifact) -> Vec<FeatureImportance> {
    let Some(values) = artifact.model().feature_importances() else {
        return Vec::new();
    };
    let mut ranked: Vec<FeatureImportance> = FEATURE_NAMES
        .iter()
        .zip(values)
        .map(|(name, &importance)| FeatureImportance {
            feature: (*name).to_string(),
            importance,
        })
        .collect();
    // Stable sort keeps feature order on ties.
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retention::metadata::fixtures::tiktok_video;
    use crate::retention::training::BoostingParams;
    use crate::retention::{synthetic, INITIAL_VERSION};

    fn estimator() -> RetentionEstimator {
        let params = BoostingParams {
            n_estimators: 20,
            ..BoostingParams::default()
        };
        let artifact =
            ModelArtifact::train(&synthetic::generate(300, 42), params, INITIAL_VERSION).unwrap();
        RetentionEstimator::new(artifact)
    }

    #[test]
    fn test_risk_tiers() {
        assert_eq!(RiskTier::classify(0.65, 0.65), RiskTier::Low);
        assert_eq!(RiskTier::classify(0.60, 0.65), RiskTier::Medium);
        assert_eq!(RiskTier::classify(0.55, 0.65), RiskTier::Medium);
        assert_eq!(RiskTier::classify(0.54, 0.65), RiskTier::High);
    }

    #[test]
    fn test_interval_from_members() {
        let (lo, hi) = confidence_interval(0.5, &[0.0, 0.2]);
        assert!((lo - (0.5 - 0.196)).abs() < 1e-12);
        assert!((hi - (0.5 + 0.196)).abs() < 1e-12);
    }

    #[test]
    fn test_interval_fallback_and_clipping() {
        let (lo, hi) = confidence_interval(0.5, &[]);
        assert!((lo - 0.4).abs() < 1e-12 && (hi - 0.6).abs() < 1e-12);
        assert_eq!(confidence_interval(0.95, &[]).1, 1.0);
        assert_eq!(confidence_interval(0.0, &[-5.0, 5.0]), (0.0, 1.0));
    }

    #[test]
    fn test_estimate_bounds_and_determinism() {
        let estimator = estimator();
        let features = FeatureVector::from_metadata(&tiktok_video()).unwrap();

        let a = estimator.estimate(&features).unwrap();
        let b = estimator.estimate(&features).unwrap();
        assert_eq!(a, b);

        let (lo, hi) = a.confidence_interval;
        assert!((0.0..=1.0).contains(&a.estimate));
        assert!(0.0 <= lo && lo <= a.estimate && a.estimate <= hi && hi <= 1.0);
    }

    #[test]
    fn test_importances_ranked() {
        let estimate = estimator()
            .estimate(&FeatureVector::from_metadata(&tiktok_video()).unwrap())
            .unwrap();
        let values: Vec<f64> = estimate
            .feature_importances
            .iter()
            .map(|f| f.importance)
            .collect();

        assert_eq!(values.len(), FEATURE_NAMES.len());
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_batch_matches_single() {
        let estimator = estimator();
        let features = FeatureVector::from_metadata(&tiktok_video()).unwrap();
        let batch = estimator.estimate_batch(&[features, features]).unwrap();
        assert_eq!(batch[0], estimator.estimate(&features).unwrap());
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_threshold_validated() {
        assert!(estimator().with_threshold(1.5).is_err());
        let strict = estimator().with_threshold(0.99).unwrap();
        assert_eq!(strict.threshold(), 0.99);
    }
}
