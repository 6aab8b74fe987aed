//! Retention predictor agent
//!
//! Wraps a [`RetentionEstimator`] with request handling, suggestion
//! generation, prediction caching and model updates. The model can be
//! swapped at runtime; readers take a cheap clone of the current estimator
//! and never hold the lock across an await.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::estimator::{FeatureImportance, RetentionEstimator, RiskTier};
use super::features::FeatureVector;
use super::persistence::ModelArtifact;
use super::suggestions::suggestions;
use super::synthetic::{self, Dataset, DEFAULT_SEED};
use super::training::BoostingParams;
use super::viral::{viral_score, FirstHourMetrics, Recommendation};
use super::VideoMetadata;
use crate::config::RetentionConfig;
use crate::kv::{get_json, put_json, KvStore};
use crate::{Error, Result};

/// Cache lifetime of a prediction.
pub const PREDICTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fewer historical records than this and an update is skipped.
pub const MIN_UPDATE_SAMPLES: usize = 50;

/// Synthetic rows mixed into every update.
pub const UPDATE_SYNTHETIC_SAMPLES: usize = 500;

/// Version assigned when updating without an installed model.
const FIRST_UPDATE_VERSION: &str = "1.1.0";

/// Cache key for a video's prediction.
#[must_use]
pub fn prediction_key(video_id: &str) -> String {
    format!("retention_prediction:{video_id}")
}

/// Observed retention for a published video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    /// Video metadata at publish time
    pub metadata: VideoMetadata,
    /// Measured retention in [0, 1]
    pub actual_retention: f64,
}

/// Full prediction for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionPrediction {
    /// Video ID
    pub video_id: String,
    /// Point estimate in [0, 1]
    pub predicted_retention_rate: f64,
    /// `(lower, upper)` in [0, 1]
    pub confidence_interval: (f64, f64),
    /// Risk tier
    pub risk_level: RiskTier,
    /// Up to five suggestions, or a single status message
    pub optimization_suggestions: Vec<String>,
    /// Model importances, highest first
    pub feature_importance: Vec<FeatureImportance>,
    /// Version of the model that produced this
    pub model_version: String,
    /// When the prediction was made
    pub predicted_at: DateTime<Utc>,
}

/// Viral score for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViralScore {
    /// Video ID
    pub video_id: String,
    /// Score in [0, 100]
    pub viral_score: f64,
    /// Retention estimate the score was built on
    pub retention_rate: f64,
    /// Publish or review
    pub recommendation: Recommendation,
}

/// Outcome of a model update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelUpdate {
    /// Not enough data; the current model was kept
    Skipped {
        /// Why
        reason: String,
        /// Records supplied
        samples: usize,
    },
    /// A new model was trained, saved and installed
    Success {
        /// Version of the new model
        new_version: String,
        /// R² on the supplied records
        model_score: f64,
        /// Records supplied
        samples_used: usize,
        /// When the update finished
        updated_at: DateTime<Utc>,
    },
}

/// Requests accepted by the retention predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RetentionRequest {
    /// Predict retention for a video
    Predict {
        /// Video to score
        metadata: VideoMetadata,
    },
    /// Combine predicted retention with early metrics
    ViralScore {
        /// Video to score
        metadata: VideoMetadata,
        /// Metrics from the first hour live, if any
        #[serde(default)]
        first_hour_metrics: Option<FirstHourMetrics>,
    },
    /// Retrain on observed retention
    UpdateModel {
        /// Observed records
        #[serde(default)]
        historical_data: Vec<HistoricalRecord>,
    },
}

/// Responses produced by the retention predictor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RetentionResponse {
    /// Reply to [`RetentionRequest::Predict`]
    Prediction(RetentionPrediction),
    /// Reply to [`RetentionRequest::ViralScore`]
    ViralScore(ViralScore),
    /// Reply to [`RetentionRequest::UpdateModel`]
    ModelUpdate(ModelUpdate),
}

/// Retention prediction agent over an injected cache.
#[derive(Debug)]
pub struct RetentionPredictor<S> {
    store: S,
    config: RetentionConfig,
    estimator: RwLock<Option<RetentionEstimator>>,
}

impl<S: KvStore> RetentionPredictor<S> {
    /// Create a predictor with no model installed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `config` is invalid.
    pub fn new(store: S, config: RetentionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            estimator: RwLock::new(None),
        })
    }

    /// Install `artifact` and return the predictor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFormat`] if the artifact is invalid.
    pub fn with_artifact(self, artifact: ModelArtifact) -> Result<Self> {
        self.install(artifact)?;
        Ok(self)
    }

    /// Load the artifact at the configured model path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotLoaded`] if no artifact exists there.
    pub fn load_model(&self) -> Result<()> {
        let artifact = ModelArtifact::load(&self.config.model_path)?;
        self.install(artifact)
    }

    /// Load the configured artifact if one exists.
    ///
    /// Returns `false` when nothing is at the model path. A file that exists
    /// but cannot be used is an error, so a retrain never overwrites it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`], [`Error::ModelFormat`] or [`Error::Io`] for an
    /// unreadable or incompatible artifact.
    pub fn load_model_if_present(&self) -> Result<bool> {
        match self.load_model() {
            Ok(()) => Ok(true),
            Err(Error::ModelNotLoaded(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Replace the current model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFormat`] if the artifact is invalid.
    pub fn install(&self, artifact: ModelArtifact) -> Result<()> {
        artifact.validate()?;
        let estimator = RetentionEstimator::new(artifact).with_threshold(self.config.retention_threshold)?;
        let mut slot = self
            .estimator
            .write()
            .map_err(|_| Error::Internal("model slot poisoned".to_string()))?;
        *slot = Some(estimator);
        Ok(())
    }

    /// Current estimator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotLoaded`] if no model is installed.
    pub fn estimator(&self) -> Result<RetentionEstimator> {
        self.estimator
            .read()
            .map_err(|_| Error::Internal("model slot poisoned".to_string()))?
            .clone()
            .ok_or_else(|| {
                Error::ModelNotLoaded(format!(
                    "no model installed (expected at {})",
                    self.config.model_path.display()
                ))
            })
    }

    /// Version of the installed model, if any.
    #[must_use]
    pub fn model_version(&self) -> Option<String> {
        self.estimator()
            .ok()
            .map(|e| e.artifact().version().to_string())
    }

    /// Get the cache handle.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    pub const fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Dispatch a request.
    ///
    /// `update_model` requests fit the ensemble on the calling thread; from
    /// a runtime, route them through [`update_model_blocking`](Self::update_model_blocking).
    ///
    /// # Errors
    ///
    /// Propagates the error of the dispatched operation.
    pub async fn process(&self, request: RetentionRequest) -> Result<RetentionResponse> {
        match request {
            RetentionRequest::Predict { metadata } => self
                .predict(&metadata)
                .await
                .map(RetentionResponse::Prediction),
            RetentionRequest::ViralScore {
                metadata,
                first_hour_metrics,
            } => self
                .viral_score(&metadata, first_hour_metrics.as_ref())
                .await
                .map(RetentionResponse::ViralScore),
            RetentionRequest::UpdateModel { historical_data } => self
                .update_model(&historical_data)
                .map(RetentionResponse::ModelUpdate),
        }
    }

    /// Predict retention, attach suggestions, and cache the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for bad metadata, [`Error::ModelNotLoaded`]
    /// without a model, or a cache error.
    #[instrument(skip(self, metadata), fields(video_id = %metadata.video_id))]
    pub async fn predict(&self, metadata: &VideoMetadata) -> Result<RetentionPrediction> {
        let features = FeatureVector::from_metadata(metadata)?;
        let estimator = self.estimator()?;
        let estimate = estimator.estimate(&features)?;

        let prediction = RetentionPrediction {
            video_id: metadata.video_id.clone(),
            predicted_retention_rate: estimate.estimate,
            confidence_interval: estimate.confidence_interval,
            risk_level: estimate.risk_tier,
            optimization_suggestions: suggestions(
                metadata,
                estimate.estimate,
                estimator.threshold(),
            ),
            feature_importance: estimate.feature_importances,
            model_version: estimator.artifact().version().to_string(),
            predicted_at: Utc::now(),
        };

        put_json(
            &self.store,
            &prediction_key(&metadata.video_id),
            &prediction,
            PREDICTION_TTL,
        )
        .await?;

        info!(
            retention = prediction.predicted_retention_rate,
            risk = prediction.risk_level.as_str(),
            "predicted retention"
        );
        Ok(prediction)
    }

    /// Last cached prediction for a video.
    ///
    /// # Errors
    ///
    /// Returns a cache or decode error.
    pub async fn cached_prediction(&self, video_id: &str) -> Result<Option<RetentionPrediction>> {
        get_json(&self.store, &prediction_key(video_id)).await
    }

    /// Score viral potential from predicted retention and early metrics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for out-of-range first-hour rates, then
    /// the same errors as [`predict`](Self::predict).
    #[instrument(skip(self, metadata, first_hour), fields(video_id = %metadata.video_id))]
    pub async fn viral_score(
        &self,
        metadata: &VideoMetadata,
        first_hour: Option<&FirstHourMetrics>,
    ) -> Result<ViralScore> {
        if let Some(metrics) = first_hour {
            metrics.validate()?;
        }
        let prediction = self.predict(metadata).await?;
        let score = viral_score(prediction.predicted_retention_rate, first_hour);
        Ok(ViralScore {
            video_id: prediction.video_id,
            viral_score: score,
            retention_rate: prediction.predicted_retention_rate,
            recommendation: Recommendation::from_score(score),
        })
    }

    /// Run [`update_model`](Self::update_model) on tokio's blocking pool.
    ///
    /// # Errors
    ///
    /// The update's own errors, or [`Error::Internal`] if the worker panicked.
    pub async fn update_model_blocking(
        self: Arc<Self>,
        history: Vec<HistoricalRecord>,
    ) -> Result<ModelUpdate>
    where
        S: 'static,
    {
        tokio::task::spawn_blocking(move || self.update_model(&history))
            .await
            .map_err(|e| Error::Internal(format!("model update worker failed: {e}")))?
    }

    /// Retrain on observed retention mixed with synthetic rows.
    ///
    /// The new model is saved to the configured path before it replaces the
    /// current one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad record, or a training or IO
    /// error.
    #[instrument(skip(self, history), fields(samples = history.len()))]
    pub fn update_model(&self, history: &[HistoricalRecord]) -> Result<ModelUpdate> {
        if history.len() < MIN_UPDATE_SAMPLES {
            info!("skipping model update");
            return Ok(ModelUpdate::Skipped {
                reason: format!(
                    "Insufficient data for update (minimum {MIN_UPDATE_SAMPLES} samples required)"
                ),
                samples: history.len(),
            });
        }

        let recent = observed_dataset(history)?;
        let mut combined = recent.clone();
        combined.extend(synthetic::generate(UPDATE_SYNTHETIC_SAMPLES, DEFAULT_SEED));

        let new_version = match self.estimator() {
            Ok(current) => current.artifact().next_version()?,
            Err(_) => FIRST_UPDATE_VERSION.to_string(),
        };
        let artifact = ModelArtifact::train(&combined, BoostingParams::production(), &new_version)?;
        let model_score = artifact.score(&recent)?;

        artifact.save(&self.config.model_path)?;
        self.install(artifact)?;

        info!(version = %new_version, model_score, "model updated");
        Ok(ModelUpdate::Success {
            new_version,
            model_score,
            samples_used: history.len(),
            updated_at: Utc::now(),
        })
    }
}

fn observed_dataset(history: &[HistoricalRecord]) -> Result<Dataset> {
    let mut data = Dataset::default();
    for (i, record) in history.iter().enumerate() {
        if !(0.0..=1.0).contains(&record.actual_retention) {
            return Err(Error::Validation(format!(
                "historical_data[{i}].actual_retention must be in [0, 1], got {}",
                record.actual_retention
            )));
        }
        let features = FeatureVector::from_metadata(&record.metadata)
            .map_err(|e| Error::Validation(format!("historical_data[{i}]: {e}")))?;
        data.rows.push(features.values().to_vec());
        data.targets.push(record.actual_retention);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKvStore;
    use crate::retention::metadata::fixtures::tiktok_video;
    use crate::retention::INITIAL_VERSION;

    fn small_artifact() -> ModelArtifact {
        let params = BoostingParams {
            n_estimators: 20,
            ..BoostingParams::default()
        };
        ModelArtifact::train(&synthetic::generate(300, 42), params, INITIAL_VERSION).unwrap()
    }

    fn predictor(dir: &tempfile::TempDir) -> RetentionPredictor<MemoryKvStore> {
        let config = RetentionConfig {
            model_path: dir.path().join("model.json"),
            ..RetentionConfig::default()
        };
        RetentionPredictor::new(MemoryKvStore::new(), config).unwrap()
    }

    #[tokio::test]
    async fn test_predict_without_model_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let err = predictor(&dir).predict(&tiktok_video()).await.unwrap_err();
        assert!(matches!(err, Error::ModelNotLoaded(_)));
    }

    #[tokio::test]
    async fn test_predict_caches_result() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir).with_artifact(small_artifact()).unwrap();

        let prediction = predictor.predict(&tiktok_video()).await.unwrap();
        assert_eq!(prediction.model_version, "1.0.0");
        assert!(!prediction.optimization_suggestions.is_empty());
        assert!(prediction.optimization_suggestions.len() <= 5);

        let cached = predictor.cached_prediction("test-video-123").await.unwrap().unwrap();
        assert_eq!(cached.video_id, prediction.video_id);
        assert!(predictor.store().ttl(&prediction_key("test-video-123")).unwrap() <= PREDICTION_TTL);
    }

    #[tokio::test]
    async fn test_predict_rejects_bad_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir).with_artifact(small_artifact()).unwrap();
        let mut video = tiktok_video();
        video.duration_seconds = 1000;
        assert!(matches!(
            predictor.predict(&video).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_viral_score_uses_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir).with_artifact(small_artifact()).unwrap();

        let score = predictor.viral_score(&tiktok_video(), None).await.unwrap();
        assert!((score.viral_score - score.retention_rate * 50.0).abs() < 1e-9);
        assert_eq!(score.recommendation, Recommendation::from_score(score.viral_score));
    }

    #[tokio::test]
    async fn test_viral_score_rejects_negative_rate() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir).with_artifact(small_artifact()).unwrap();
        let early = FirstHourMetrics {
            engagement_rate: -5.0,
            ..FirstHourMetrics::default()
        };

        let err = predictor
            .viral_score(&tiktok_video(), Some(&early))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(predictor.cached_prediction("test-video-123").await.unwrap().is_none());
    }

    #[test]
    fn test_load_if_present_tolerates_only_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir);
        assert!(!predictor.load_model_if_present().unwrap());

        std::fs::write(&predictor.config().model_path, b"{not json").unwrap();
        let err = predictor.load_model_if_present().unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(predictor.model_version().is_none());

        small_artifact().save(&predictor.config().model_path).unwrap();
        assert!(predictor.load_model_if_present().unwrap());
        assert_eq!(predictor.model_version().as_deref(), Some(INITIAL_VERSION));
    }

    #[tokio::test]
    async fn test_update_runs_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = Arc::new(predictor(&dir));
        let history = vec![
            HistoricalRecord {
                metadata: tiktok_video(),
                actual_retention: 0.7,
            };
            5
        ];

        let update = Arc::clone(&predictor)
            .update_model_blocking(history)
            .await
            .unwrap();
        assert!(matches!(update, ModelUpdate::Skipped { samples: 5, .. }));
    }

    #[test]
    fn test_poisoned_model_slot_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir);
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = predictor.estimator.write().unwrap();
            panic!("writer died holding the model slot");
        }));

        assert!(matches!(predictor.estimator(), Err(Error::Internal(_))));
        assert!(matches!(
            predictor.install(small_artifact()),
            Err(Error::Internal(_))
        ));
    }

    #[test]
    fn test_update_skipped_below_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir);
        let history = vec![
            HistoricalRecord {
                metadata: tiktok_video(),
                actual_retention: 0.7,
            };
            10
        ];
        match predictor.update_model(&history).unwrap() {
            ModelUpdate::Skipped { samples, .. } => assert_eq!(samples, 10),
            other => panic!("expected skip, got {other:?}"),
        }
        assert!(!dir.path().join("model.json").exists());
    }

    #[test]
    fn test_update_rejects_out_of_range_target() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = predictor(&dir);
        let history = vec![
            HistoricalRecord {
                metadata: tiktok_video(),
                actual_retention: 1.5,
            };
            60
        ];
        assert!(matches!(
            predictor.update_model(&history),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_request_parsing() {
        let request: RetentionRequest = serde_json::from_value(serde_json::json!({
            "action": "viral_score",
            "metadata": serde_json::to_value(tiktok_video()).unwrap(),
        }))
        .unwrap();
        assert!(matches!(
            request,
            RetentionRequest::ViralScore {
                first_hour_metrics: None,
                ..
            }
        ));

        let update: RetentionRequest =
            serde_json::from_str(r#"{"action": "update_model"}"#).unwrap();
        assert_eq!(
            update,
            RetentionRequest::UpdateModel {
                historical_data: Vec::new()
            }
        );

        assert!(serde_json::from_str::<RetentionRequest>(r#"{"action": "explode"}"#).is_err());
    }
}
