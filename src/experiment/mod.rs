//! A/B experiments over content variants
//!
//! ## Schema Overview
//!
//! ```text
//! ExperimentRecord (1) ──< Variant (N)
//!        │
//!        └──< VariantResult (N) [written at completion]
//! ```
//!
//! An experiment is created from a content asset, its variants run for the
//! configured duration, and analysis collects per-variant metrics and hands
//! the engagement rates to [`WinnerSelector`]. The first variant is the
//! control.
//!
//! ## Usage
//!
//! ```rust
//! use engagement_lab::experiment::{DecisionKind, VariantMetricRecord, WinnerSelector};
//!
//! let records = vec![
//!     VariantMetricRecord::new("control", 1000, 0.050).unwrap(),
//!     VariantMetricRecord::new("b", 1000, 0.052).unwrap(),
//! ];
//!
//! // Nothing is significant, so the best raw rate is named as a soft call.
//! let decision = WinnerSelector::default().select_from(&records);
//! assert_eq!(decision.kind(), DecisionKind::BestPerformer);
//! assert_eq!(decision.winner(), Some("b"));
//! ```

mod config;
mod decision;
mod experiment_record;
mod generator;
mod manager;
mod metric_record;
mod metrics_source;
mod stats;
mod variant;
mod winner;

pub use config::{ExperimentConfig, MAX_VARIANTS, MIN_VARIANTS};
pub use decision::{ChallengerComparison, ComparisonOutcome, DecisionKind, ExperimentDecision};
pub use experiment_record::{
    ExperimentRecord, ExperimentRecordBuilder, ExperimentStatus, VariantResult,
};
pub use generator::{
    generate_variants, hook_variants, thumbnail_variants, timing_variants, variants_of_type,
    ContentData, TIMING_SLOT_MINUTES,
};
pub use manager::{
    experiment_key, CreatedExperiment, ExperimentAnalysis, ExperimentManager, ExperimentRequest,
    ExperimentResponse, VariantSummary, WinnerSummary, ACTIVE_EXPERIMENT_TTL,
    COMPLETED_EXPERIMENT_TTL,
};
pub use metric_record::{VariantMetricRecord, VariantMetrics};
pub use metrics_source::{
    FixedMetricsSource, MetricsSource, SimulatedMetricsSource, BASELINE_ENGAGEMENT_RATE,
};
pub use stats::{erf, normal_cdf, two_proportion_z_test, TwoProportionTest};
pub use variant::{Variant, VariantType};
pub use winner::WinnerSelector;
