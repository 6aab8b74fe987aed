//! Winner selection over variant engagement rates
//!
//! Challengers are tested against control in input order with the pooled
//! two-proportion z-test. The first challenger that clears both the sample
//! gate and the confidence threshold, with a rate above control, wins. Later
//! challengers are still reported but never displace it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    two_proportion_z_test, ChallengerComparison, ComparisonOutcome, DecisionKind,
    ExperimentConfig, ExperimentDecision, VariantMetricRecord,
};

/// Stateless winner selector.
///
/// Cheap to copy and safe to share across threads; it only reads its inputs.
///
/// # Example
/// ```
/// use engagement_lab::experiment::{DecisionKind, VariantMetricRecord, WinnerSelector};
///
/// let selector = WinnerSelector::new(100, 0.95);
/// let control = VariantMetricRecord::new("control", 500, 0.05).unwrap();
/// let challenger = VariantMetricRecord::new("bold-hook", 500, 0.09).unwrap();
///
/// let decision = selector.select(&control, &[challenger]);
/// assert_eq!(decision.winner(), Some("bold-hook"));
/// assert_eq!(decision.kind(), DecisionKind::Significant);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WinnerSelector {
    minimum_sample_size: u64,
    confidence_threshold: f64,
    fallback_to_best_performer: bool,
}

impl Default for WinnerSelector {
    fn default() -> Self {
        Self::from_config(&ExperimentConfig::default())
    }
}

impl WinnerSelector {
    /// Create a selector with the fallback winner enabled.
    #[must_use]
    pub const fn new(minimum_sample_size: u64, confidence_threshold: f64) -> Self {
        Self {
            minimum_sample_size,
            confidence_threshold,
            fallback_to_best_performer: true,
        }
    }

    /// Create a selector from experiment configuration.
    #[must_use]
    pub const fn from_config(config: &ExperimentConfig) -> Self {
        Self {
            minimum_sample_size: config.minimum_sample_size,
            confidence_threshold: config.confidence_threshold,
            fallback_to_best_performer: config.fallback_to_best_performer,
        }
    }

    /// Enable or disable the best-performer fallback.
    #[must_use]
    pub const fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_best_performer = enabled;
        self
    }

    /// Minimum challenger sample size.
    #[must_use]
    pub const fn minimum_sample_size(&self) -> u64 {
        self.minimum_sample_size
    }

    /// Required confidence level.
    #[must_use]
    pub const fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    /// Decide among `control` and `challengers`.
    ///
    /// Never fails: degenerate inputs produce [`DecisionKind::NoDecision`]
    /// or skip the affected comparison.
    #[must_use]
    pub fn select(
        &self,
        control: &VariantMetricRecord,
        challengers: &[VariantMetricRecord],
    ) -> ExperimentDecision {
        if challengers.is_empty() {
            return ExperimentDecision::no_decision(
                "need a control and at least one challenger",
            );
        }

        let mut comparisons = Vec::with_capacity(challengers.len());
        let mut winner: Option<(usize, f64)> = None;

        for (idx, challenger) in challengers.iter().enumerate() {
            let outcome = self.compare(control, challenger, winner.is_none());
            if let ComparisonOutcome::Tested {
                test,
                qualified: true,
            } = &outcome
            {
                winner = Some((idx, test.confidence));
            }
            debug!(
                variant = challenger.variant_id(),
                ?outcome,
                "compared challenger against control"
            );
            comparisons.push(ChallengerComparison {
                variant_id: challenger.variant_id().to_string(),
                outcome,
            });
        }

        if let Some((idx, confidence)) = winner {
            let challenger = &challengers[idx];
            let rationale = format!(
                "{} beat control {} ({:.4} vs {:.4}) at {:.1}% confidence (threshold {:.1}%)",
                challenger.variant_id(),
                control.variant_id(),
                challenger.success_rate(),
                control.success_rate(),
                confidence * 100.0,
                self.confidence_threshold * 100.0
            );
            return ExperimentDecision::new(
                Some(challenger.variant_id().to_string()),
                confidence,
                DecisionKind::Significant,
                rationale,
                comparisons,
            );
        }

        if !self.fallback_to_best_performer {
            return ExperimentDecision::new(
                None,
                0.0,
                DecisionKind::NoDecision,
                "no challenger reached significance".to_string(),
                comparisons,
            );
        }

        self.best_performer(control, challengers, comparisons)
    }

    /// Decide over a list where the first record is control.
    #[must_use]
    pub fn select_from(&self, records: &[VariantMetricRecord]) -> ExperimentDecision {
        match records.split_first() {
            Some((control, challengers)) => self.select(control, challengers),
            None => ExperimentDecision::no_decision("no records supplied"),
        }
    }

    fn compare(
        &self,
        control: &VariantMetricRecord,
        challenger: &VariantMetricRecord,
        open: bool,
    ) -> ComparisonOutcome {
        if challenger.sample_size() < self.minimum_sample_size {
            return ComparisonOutcome::BelowMinimumSample {
                sample_size: challenger.sample_size(),
                minimum: self.minimum_sample_size,
            };
        }
        match two_proportion_z_test(control, challenger) {
            Some(test) => {
                let qualified = open
                    && test.confidence >= self.confidence_threshold
                    && challenger.success_rate() > control.success_rate();
                ComparisonOutcome::Tested { test, qualified }
            }
            None => ComparisonOutcome::Degenerate,
        }
    }

    fn best_performer(
        &self,
        control: &VariantMetricRecord,
        challengers: &[VariantMetricRecord],
        comparisons: Vec<ChallengerComparison>,
    ) -> ExperimentDecision {
        // First maximum wins, control included at position 0.
        let mut best = control;
        let mut best_confidence = 0.0;
        for (challenger, comparison) in challengers.iter().zip(&comparisons) {
            if challenger.success_rate() > best.success_rate() {
                best = challenger;
                best_confidence = comparison.confidence().unwrap_or(0.0);
            }
        }

        let rationale = format!(
            "no challenger reached {:.1}% confidence; {} has the highest raw rate ({:.4}) \
             and is reported as best performer without statistical validation",
            self.confidence_threshold * 100.0,
            best.variant_id(),
            best.success_rate()
        );
        ExperimentDecision::new(
            Some(best.variant_id().to_string()),
            best_confidence,
            DecisionKind::BestPerformer,
            rationale,
            comparisons,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, n: u64, rate: f64) -> VariantMetricRecord {
        VariantMetricRecord::new(id, n, rate).unwrap()
    }

    #[test]
    fn test_significant_winner() {
        let selector = WinnerSelector::new(100, 0.95);
        let decision = selector.select(&rec("c", 500, 0.05), &[rec("b", 500, 0.09)]);

        assert_eq!(decision.winner(), Some("b"));
        assert!(decision.is_significant());
        assert!(decision.confidence() >= 0.95);
        assert_eq!(decision.comparisons().len(), 1);
    }

    #[test]
    fn test_first_qualifying_challenger_wins() {
        let selector = WinnerSelector::new(100, 0.95);
        let decision = selector.select(
            &rec("c", 1000, 0.05),
            &[
                rec("weak", 1000, 0.051),
                rec("first", 1000, 0.08),
                rec("bigger", 1000, 0.12),
            ],
        );

        assert_eq!(decision.winner(), Some("first"));
        assert_eq!(decision.kind(), DecisionKind::Significant);
        // Later challengers are tested but not qualified
        match &decision.comparisons()[2].outcome {
            ComparisonOutcome::Tested { qualified, .. } => assert!(!qualified),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_worse_challenger_never_significant() {
        let selector = WinnerSelector::new(100, 0.95).with_fallback(false);
        let decision = selector.select(&rec("c", 1000, 0.10), &[rec("b", 1000, 0.02)]);

        assert_eq!(decision.winner(), None);
        assert_eq!(decision.kind(), DecisionKind::NoDecision);
    }

    #[test]
    fn test_small_sample_gated() {
        let selector = WinnerSelector::new(100, 0.95);
        let decision = selector.select(&rec("c", 500, 0.05), &[rec("tiny", 99, 0.90)]);

        assert_eq!(decision.kind(), DecisionKind::BestPerformer);
        assert_eq!(decision.winner(), Some("tiny"));
        assert_eq!(decision.confidence(), 0.0);
        assert!(matches!(
            decision.comparisons()[0].outcome,
            ComparisonOutcome::BelowMinimumSample { sample_size: 99, minimum: 100 }
        ));
    }

    #[test]
    fn test_fallback_picks_control_when_highest() {
        let selector = WinnerSelector::new(100, 0.95);
        let decision = selector.select(
            &rec("c", 200, 0.06),
            &[rec("a", 200, 0.055), rec("b", 200, 0.058)],
        );

        assert_eq!(decision.kind(), DecisionKind::BestPerformer);
        assert_eq!(decision.winner(), Some("c"));
        assert_eq!(decision.confidence(), 0.0);
    }

    #[test]
    fn test_fallback_carries_tested_confidence() {
        let selector = WinnerSelector::new(100, 0.95);
        let decision = selector.select(&rec("c", 200, 0.05), &[rec("a", 200, 0.06)]);

        assert_eq!(decision.kind(), DecisionKind::BestPerformer);
        assert_eq!(decision.winner(), Some("a"));
        let tested = decision.comparisons()[0].confidence().unwrap();
        assert!((decision.confidence() - tested).abs() < 1e-12);
        assert!(decision.confidence() < 0.95);
    }

    #[test]
    fn test_fallback_ties_keep_first() {
        let selector = WinnerSelector::new(100, 0.95);
        let decision = selector.select(
            &rec("c", 200, 0.05),
            &[rec("a", 200, 0.07), rec("b", 200, 0.07)],
        );
        assert_eq!(decision.winner(), Some("a"));
    }

    #[test]
    fn test_degenerate_comparison_skipped() {
        let selector = WinnerSelector::new(10, 0.95);
        let decision = selector.select(&rec("c", 100, 0.0), &[rec("b", 100, 0.0)]);

        assert!(matches!(
            decision.comparisons()[0].outcome,
            ComparisonOutcome::Degenerate
        ));
        assert_eq!(decision.kind(), DecisionKind::BestPerformer);
        assert_eq!(decision.winner(), Some("c"));
    }

    #[test]
    fn test_single_record_no_decision() {
        let selector = WinnerSelector::default();
        let decision = selector.select_from(&[rec("only", 1000, 0.5)]);
        assert_eq!(decision.kind(), DecisionKind::NoDecision);
        assert!(decision.winner().is_none());

        assert_eq!(
            selector.select_from(&[]).kind(),
            DecisionKind::NoDecision
        );
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let control = rec("c", 500, 0.05);
        let challenger = rec("b", 500, 0.09);
        let confidence = two_proportion_z_test(&control, &challenger)
            .unwrap()
            .confidence;

        let selector = WinnerSelector::new(100, confidence);
        let decision = selector.select(&control, &[challenger]);
        assert!(decision.is_significant());
    }
}
