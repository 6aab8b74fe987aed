//! Retention prediction for short-form video
//!
//! ## Pipeline
//!
//! ```text
//! VideoMetadata ──> FeatureVector (13) ──> StandardScaler ──> GBRT ensemble
//!                                                                │
//!        suggestions <── risk tier <── estimate ± 1.96σ(members) ┘
//! ```
//!
//! A [`ModelArtifact`] holds the fitted scaler and ensemble. It is trained
//! from synthetic data at bootstrap and retrained on observed retention by
//! [`RetentionPredictor::update_model`].
//!
//! ## Usage
//!
//! ```rust
//! use engagement_lab::retention::{FeatureVector, ModelArtifact, RetentionEstimator, RiskTier};
//! # use engagement_lab::retention::FEATURE_COUNT;
//!
//! let estimator = RetentionEstimator::new(ModelArtifact::bootstrap(200, 42).unwrap());
//! # let features = FeatureVector::new([1.0; FEATURE_COUNT]).unwrap();
//! let estimate = estimator.estimate(&features).unwrap();
//!
//! assert!((0.0..=1.0).contains(&estimate.estimate));
//! assert_eq!(estimate.risk_tier, RiskTier::classify(estimate.estimate, 0.65));
//! ```

mod estimator;
mod features;
pub(crate) mod metadata;
mod model;
mod persistence;
mod predictor;
mod scaler;
mod suggestions;
pub mod synthetic;
mod training;
mod viral;

pub use estimator::{
    confidence_interval, FeatureImportance, RetentionEstimate, RetentionEstimator, RiskTier,
    FALLBACK_INTERVAL_HALF_WIDTH,
};
pub use features::{
    emotion_score, platform_one_hot, transcript_complexity, FeatureVector, FEATURE_COUNT,
    FEATURE_NAMES,
};
pub use metadata::{Platform, VideoMetadata, MAX_DURATION_SECONDS, MIN_DURATION_SECONDS};
pub use model::{r2_score, GradientBoostedModel, RegressionTree, TreeNode};
pub use persistence::{ModelArtifact, INITIAL_VERSION};
pub use predictor::{
    prediction_key, HistoricalRecord, ModelUpdate, RetentionPrediction, RetentionPredictor,
    RetentionRequest, RetentionResponse, ViralScore, MIN_UPDATE_SAMPLES, PREDICTION_TTL,
    UPDATE_SYNTHETIC_SAMPLES,
};
pub use scaler::StandardScaler;
pub use suggestions::{suggestions, MAX_SUGGESTIONS};
pub use synthetic::Dataset;
pub use training::{fit, BoostingParams};
pub use viral::{viral_score, FirstHourMetrics, Recommendation, PROCEED_THRESHOLD};
