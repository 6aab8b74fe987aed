//! Experiment manager - creates experiments and decides their winners
//!
//! All collaborators are injected: the cache (`KvStore`), the metrics feed
//! (`MetricsSource`), and the notification sink. The manager itself holds no
//! state beyond configuration and the variant RNG.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::metrics_source::BASELINE_ENGAGEMENT_RATE;
use super::{
    generate_variants, ContentData, ExperimentConfig, ExperimentDecision, ExperimentRecord,
    MetricsSource, VariantMetricRecord, VariantResult, VariantType, WinnerSelector, MAX_VARIANTS,
    MIN_VARIANTS,
};
use crate::kv::{get_json, put_json, KvStore};
use crate::notify::{Notification, NotificationSink, NOTIFICATION_STREAM};
use crate::{Error, Result};

/// Cache lifetime of an active experiment.
pub const ACTIVE_EXPERIMENT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Cache lifetime of a completed experiment.
pub const COMPLETED_EXPERIMENT_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Cache key for an experiment.
#[must_use]
pub fn experiment_key(experiment_id: &str) -> String {
    format!("experiment:{experiment_id}")
}

/// Requests accepted by the experiment manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExperimentRequest {
    /// Create an experiment for a content asset
    Create {
        /// Asset to vary
        content_data: ContentData,
    },
    /// Analyze a running experiment and pick a winner
    Analyze {
        /// Experiment to analyze
        experiment_id: String,
    },
}

/// Responses produced by the experiment manager.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExperimentResponse {
    /// Reply to [`ExperimentRequest::Create`]
    Created(CreatedExperiment),
    /// Reply to [`ExperimentRequest::Analyze`]
    Analyzed(ExperimentAnalysis),
}

/// Variant as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSummary {
    /// Variant ID
    pub variant_id: String,
    /// Variant type
    #[serde(rename = "type")]
    pub variant_type: VariantType,
    /// Applied changes
    pub changes: serde_json::Value,
}

/// Result of creating an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedExperiment {
    /// New experiment ID
    pub experiment_id: String,
    /// Generated variants
    pub variants: Vec<VariantSummary>,
    /// Planned test duration
    pub test_duration_minutes: u32,
}

/// Winner details in an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerSummary {
    /// Winning variant ID
    pub variant_id: String,
    /// Winner's collected metrics
    pub metrics: std::collections::BTreeMap<String, f64>,
    /// Confidence attached to the decision
    pub confidence_level: f64,
}

/// Result of analyzing an experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentAnalysis {
    /// Analyzed experiment
    pub experiment_id: String,
    /// Winner, if one was named
    pub winner: Option<WinnerSummary>,
    /// Full decision including per-challenger comparisons
    pub decision: ExperimentDecision,
    /// Every variant's results
    pub all_results: Vec<VariantResult>,
}

/// A/B experiment orchestration over injected collaborators.
#[derive(Debug)]
pub struct ExperimentManager<S, M, N> {
    store: S,
    metrics: M,
    sink: N,
    config: ExperimentConfig,
    rng: Mutex<StdRng>,
}

impl<S, M, N> ExperimentManager<S, M, N>
where
    S: KvStore,
    M: MetricsSource,
    N: NotificationSink,
{
    /// Create a manager with default configuration and an entropy-seeded RNG.
    pub fn new(store: S, metrics: M, sink: N) -> Self {
        Self {
            store,
            metrics,
            sink,
            config: ExperimentConfig::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the base configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configuration is invalid.
    pub fn with_config(mut self, config: ExperimentConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Seed the variant RNG for reproducible thumbnail choices.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Get the cache handle.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Get the notification sink.
    pub const fn sink(&self) -> &N {
        &self.sink
    }

    /// Get the base configuration.
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Dispatch a request.
    ///
    /// # Errors
    ///
    /// Propagates the error of the dispatched operation.
    pub async fn process(&self, request: ExperimentRequest) -> Result<ExperimentResponse> {
        match request {
            ExperimentRequest::Create { content_data } => self
                .create_experiment(&content_data)
                .await
                .map(ExperimentResponse::Created),
            ExperimentRequest::Analyze { experiment_id } => self
                .analyze_experiment(&experiment_id)
                .await
                .map(ExperimentResponse::Analyzed),
        }
    }

    /// Create an experiment with generated variants and cache it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for invalid content or a cache error.
    #[instrument(skip(self, content), fields(content_id = %content.id))]
    pub async fn create_experiment(&self, content: &ContentData) -> Result<CreatedExperiment> {
        content.validate()?;

        let mut config = self.config.clone();
        if let Some(requested) = content.variant_count {
            config.variant_count = requested.clamp(MIN_VARIANTS, MAX_VARIANTS);
        }

        let variants = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| Error::Internal("variant RNG poisoned".to_string()))?;
            generate_variants(content, &config, &mut *rng)
        };

        let record = ExperimentRecord::new(&content.id, variants, config);
        put_json(
            &self.store,
            &experiment_key(record.experiment_id()),
            &record,
            ACTIVE_EXPERIMENT_TTL,
        )
        .await?;

        info!(
            experiment_id = record.experiment_id(),
            variants = record.variants().len(),
            "experiment created"
        );

        Ok(CreatedExperiment {
            experiment_id: record.experiment_id().to_string(),
            variants: record
                .variants()
                .iter()
                .map(|v| VariantSummary {
                    variant_id: v.variant_id().to_string(),
                    variant_type: v.variant_type(),
                    changes: v.changes().clone(),
                })
                .collect(),
            test_duration_minutes: record.config().test_duration_minutes,
        })
    }

    /// Load a cached experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`] if nothing is cached under the ID,
    /// or [`Error::Cache`] if the cached record does not decode.
    pub async fn get_experiment(&self, experiment_id: &str) -> Result<ExperimentRecord> {
        get_json(&self.store, &experiment_key(experiment_id))
            .await?
            .ok_or_else(|| Error::ExperimentNotFound(experiment_id.to_string()))
    }

    /// Collect metrics, pick a winner, finalize, and notify.
    ///
    /// The first variant is the control. Winner selection runs on engagement
    /// rate with views as the sample size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExperimentNotFound`], metric validation errors, or
    /// cache/notification failures.
    #[instrument(skip(self))]
    pub async fn analyze_experiment(&self, experiment_id: &str) -> Result<ExperimentAnalysis> {
        let mut record = self.get_experiment(experiment_id).await?;
        let tested_at = Utc::now();

        let mut records = Vec::with_capacity(record.variants().len());
        let mut results = Vec::with_capacity(record.variants().len());
        for variant in record.variants() {
            let metrics = self.metrics.collect(variant.variant_id())?;
            records.push(metrics.engagement_record(variant.variant_id())?);
            results.push(VariantResult {
                variant_id: variant.variant_id().to_string(),
                metrics: metrics.to_map(),
                sample_size: metrics.views,
                confidence_level: 0.0,
                is_winner: false,
                tested_at: Some(tested_at),
            });
        }

        let decision = WinnerSelector::from_config(record.config()).select_from(&records);

        for (result, comparison) in results.iter_mut().skip(1).zip(decision.comparisons()) {
            result.confidence_level = comparison.confidence().unwrap_or(0.0);
        }
        let winner = decision.winner().and_then(|id| {
            let result = results.iter_mut().find(|r| r.variant_id == id)?;
            result.is_winner = true;
            Some(WinnerSummary {
                variant_id: result.variant_id.clone(),
                metrics: result.metrics.clone(),
                confidence_level: decision.confidence(),
            })
        });

        info!(
            experiment_id,
            winner = ?decision.winner(),
            kind = decision.kind().as_str(),
            confidence = decision.confidence(),
            "experiment analyzed"
        );

        record.complete(
            decision.winner().map(str::to_string),
            decision.kind(),
            results.clone(),
        );
        put_json(
            &self.store,
            &experiment_key(experiment_id),
            &record,
            COMPLETED_EXPERIMENT_TTL,
        )
        .await?;

        if let Some(winner) = &winner {
            let engagement = records
                .iter()
                .find(|r| r.variant_id() == winner.variant_id)
                .map_or(0.0, VariantMetricRecord::success_rate);
            self.notify_winner(experiment_id, &decision, engagement, tested_at);
        }

        Ok(ExperimentAnalysis {
            experiment_id: experiment_id.to_string(),
            winner,
            decision,
            all_results: results,
        })
    }

    fn notify_winner(
        &self,
        experiment_id: &str,
        decision: &ExperimentDecision,
        engagement_rate: f64,
        timestamp: DateTime<Utc>,
    ) {
        let notification = Notification {
            kind: "experiment_complete".to_string(),
            payload: json!({
                "experiment_id": experiment_id,
                "winner_id": decision.winner(),
                "decision": decision.kind(),
                "improvement": {
                    "engagement_rate": format!("{:+.1}%", (engagement_rate - BASELINE_ENGAGEMENT_RATE) * 100.0),
                    "confidence": format!("{:.1}%", decision.confidence() * 100.0),
                },
                "timestamp": timestamp.to_rfc3339(),
            }),
        };
        // A lost notification must not undo a recorded decision.
        if let Err(e) = self.sink.publish(NOTIFICATION_STREAM, notification) {
            warn!(experiment_id, error = %e, "failed to publish winner notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{DecisionKind, ExperimentStatus, FixedMetricsSource, VariantMetrics};
    use crate::kv::MemoryKvStore;
    use crate::notify::MemorySink;

    fn content() -> ContentData {
        ContentData {
            id: "content-123".to_string(),
            content_type: "video".to_string(),
            hook: "Is your security up to date?".to_string(),
            variant_count: Some(3),
        }
    }

    fn metrics(views: u64, engagement_rate: f64) -> VariantMetrics {
        VariantMetrics {
            views,
            engagement_rate,
            completion_rate: 0.6,
            share_rate: 0.02,
            comment_rate: 0.01,
        }
    }

    #[tokio::test]
    async fn test_create_caches_active_experiment() {
        let manager =
            ExperimentManager::new(MemoryKvStore::new(), FixedMetricsSource::new(), MemorySink::new())
                .with_seed(1);

        let created = manager.create_experiment(&content()).await.unwrap();
        assert_eq!(created.variants.len(), 3);
        assert_eq!(created.test_duration_minutes, 120);

        let record = manager.get_experiment(&created.experiment_id).await.unwrap();
        assert_eq!(record.status(), ExperimentStatus::Active);
        assert_eq!(record.parent_content_id(), "content-123");

        let ttl = manager.store().ttl(&experiment_key(&created.experiment_id)).unwrap();
        assert!(ttl > Duration::from_secs(6 * 24 * 60 * 60));
    }

    #[tokio::test]
    async fn test_analyze_unknown_experiment() {
        let manager =
            ExperimentManager::new(MemoryKvStore::new(), FixedMetricsSource::new(), MemorySink::new());
        let err = manager.analyze_experiment("missing").await.unwrap_err();
        assert!(matches!(err, Error::ExperimentNotFound(_)));
    }

    #[tokio::test]
    async fn test_analyze_significant_winner_notifies() {
        let setup =
            ExperimentManager::new(MemoryKvStore::new(), FixedMetricsSource::new(), MemorySink::new())
                .with_seed(1);
        let created = setup.create_experiment(&content()).await.unwrap();
        let ids: Vec<String> = created.variants.iter().map(|v| v.variant_id.clone()).collect();

        let source = FixedMetricsSource::new()
            .with(&ids[0], metrics(500, 0.05))
            .with(&ids[1], metrics(500, 0.09))
            .with(&ids[2], metrics(500, 0.06));
        let manager = ExperimentManager {
            store: setup.store,
            metrics: source,
            sink: MemorySink::new(),
            config: ExperimentConfig::default(),
            rng: Mutex::new(StdRng::seed_from_u64(0)),
        };

        let analysis = manager.analyze_experiment(&created.experiment_id).await.unwrap();
        assert_eq!(analysis.decision.kind(), DecisionKind::Significant);
        let winner = analysis.winner.unwrap();
        assert_eq!(winner.variant_id, ids[1]);
        assert!(winner.confidence_level >= 0.95);
        assert!(analysis.all_results[1].is_winner);
        assert_eq!(analysis.all_results[0].confidence_level, 0.0);

        let record = manager.get_experiment(&created.experiment_id).await.unwrap();
        assert_eq!(record.status(), ExperimentStatus::Completed);
        assert_eq!(record.winner_id(), Some(ids[1].as_str()));

        let messages = manager.sink().messages(NOTIFICATION_STREAM);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload["improvement"]["engagement_rate"], "+4.0%");
    }

    #[tokio::test]
    async fn test_process_dispatches_by_action() {
        let manager =
            ExperimentManager::new(MemoryKvStore::new(), FixedMetricsSource::new(), MemorySink::new());
        let request: ExperimentRequest = serde_json::from_value(json!({
            "action": "create",
            "content_data": {"id": "c-9", "content_type": "post", "hook": "Hi?"}
        }))
        .unwrap();

        match manager.process(request).await.unwrap() {
            ExperimentResponse::Created(created) => assert_eq!(created.variants.len(), 3),
            other => panic!("unexpected response {other:?}"),
        }

        let unknown = serde_json::from_value::<ExperimentRequest>(json!({"action": "delete"}));
        assert!(unknown.is_err());
    }
}
