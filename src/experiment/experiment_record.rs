//! Experiment Record - root entity for a running or finished A/B test

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DecisionKind, ExperimentConfig, Variant};

/// Lifecycle state of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    /// Variants are live and collecting data.
    Active,
    /// Analysis ran and a decision was recorded.
    Completed,
}

/// Performance of one variant at analysis time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    /// Variant ID
    pub variant_id: String,
    /// Collected metrics by name
    pub metrics: BTreeMap<String, f64>,
    /// Views counted toward the test
    pub sample_size: u64,
    /// Confidence from the z-test, 0 if never tested
    pub confidence_level: f64,
    /// Whether this variant was picked
    pub is_winner: bool,
    /// When metrics were collected
    pub tested_at: Option<DateTime<Utc>>,
}

/// Experiment Record tracks one experiment from creation to decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentRecord {
    experiment_id: String,
    parent_content_id: String,
    variants: Vec<Variant>,
    config: ExperimentConfig,
    status: ExperimentStatus,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    winner_id: Option<String>,
    decision_kind: Option<DecisionKind>,
    final_results: Vec<VariantResult>,
}

impl ExperimentRecord {
    /// Create an active experiment with a fresh UUID.
    #[must_use]
    pub fn new(
        parent_content_id: impl Into<String>,
        variants: Vec<Variant>,
        config: ExperimentConfig,
    ) -> Self {
        Self::builder(parent_content_id, config)
            .variants(variants)
            .build()
    }

    /// Create a builder for constructing an experiment record with optional fields.
    #[must_use]
    pub fn builder(
        parent_content_id: impl Into<String>,
        config: ExperimentConfig,
    ) -> ExperimentRecordBuilder {
        ExperimentRecordBuilder::new(parent_content_id, config)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the parent content ID.
    #[must_use]
    pub fn parent_content_id(&self) -> &str {
        &self.parent_content_id
    }

    /// Get the variants under test.
    #[must_use]
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Get the experiment configuration.
    #[must_use]
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the completion timestamp, if analyzed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Get the winning variant ID, if any.
    #[must_use]
    pub fn winner_id(&self) -> Option<&str> {
        self.winner_id.as_deref()
    }

    /// Get how the winner was decided, if analyzed.
    #[must_use]
    pub const fn decision_kind(&self) -> Option<DecisionKind> {
        self.decision_kind
    }

    /// Get per-variant results recorded at completion.
    #[must_use]
    pub fn final_results(&self) -> &[VariantResult] {
        &self.final_results
    }

    /// Mark the experiment completed with its decision and results.
    ///
    /// Sets `completed_at` to now.
    pub fn complete(
        &mut self,
        winner_id: Option<String>,
        decision_kind: DecisionKind,
        results: Vec<VariantResult>,
    ) {
        self.status = ExperimentStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.winner_id = winner_id;
        self.decision_kind = Some(decision_kind);
        self.final_results = results;
    }
}

/// Builder for `ExperimentRecord`.
#[derive(Debug)]
pub struct ExperimentRecordBuilder {
    experiment_id: String,
    parent_content_id: String,
    variants: Vec<Variant>,
    config: ExperimentConfig,
    created_at: DateTime<Utc>,
}

impl ExperimentRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(parent_content_id: impl Into<String>, config: ExperimentConfig) -> Self {
        Self {
            experiment_id: Uuid::new_v4().to_string(),
            parent_content_id: parent_content_id.into(),
            variants: Vec::new(),
            config,
            created_at: Utc::now(),
        }
    }

    /// Use a fixed experiment ID instead of a generated one.
    #[must_use]
    pub fn experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = experiment_id.into();
        self
    }

    /// Set the variants under test.
    #[must_use]
    pub fn variants(mut self, variants: Vec<Variant>) -> Self {
        self.variants = variants;
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `ExperimentRecord`.
    #[must_use]
    pub fn build(self) -> ExperimentRecord {
        ExperimentRecord {
            experiment_id: self.experiment_id,
            parent_content_id: self.parent_content_id,
            variants: self.variants,
            config: self.config,
            status: ExperimentStatus::Active,
            created_at: self.created_at,
            completed_at: None,
            winner_id: None,
            decision_kind: None,
            final_results: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experiment_record_new() {
        let record = ExperimentRecord::new("content-1", Vec::new(), ExperimentConfig::default());
        assert_eq!(record.parent_content_id(), "content-1");
        assert_eq!(record.status(), ExperimentStatus::Active);
        assert!(record.completed_at().is_none());
        assert!(Uuid::parse_str(record.experiment_id()).is_ok());
    }

    #[test]
    fn test_experiment_record_complete() {
        let mut record = ExperimentRecord::builder("content-1", ExperimentConfig::default())
            .experiment_id("exp-1")
            .build();
        record.complete(Some("v-2".to_string()), DecisionKind::Significant, Vec::new());

        assert_eq!(record.experiment_id(), "exp-1");
        assert_eq!(record.status(), ExperimentStatus::Completed);
        assert_eq!(record.winner_id(), Some("v-2"));
        assert_eq!(record.decision_kind(), Some(DecisionKind::Significant));
        assert!(record.completed_at().is_some());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ExperimentStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
