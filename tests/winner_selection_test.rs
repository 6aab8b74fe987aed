//! Winner selection through the public API

use engagement_lab::experiment::{
    two_proportion_z_test, ComparisonOutcome, DecisionKind, ExperimentConfig, VariantMetricRecord,
    WinnerSelector,
};

fn record(id: &str, n: u64, rate: f64) -> VariantMetricRecord {
    VariantMetricRecord::new(id, n, rate).unwrap()
}

// ============================================================================
// Significant winners
// ============================================================================

#[test]
fn test_clear_lift_is_significant() {
    let selector = WinnerSelector::new(100, 0.95);
    let decision = selector.select_from(&[
        record("control", 500, 0.05),
        record("challenger", 500, 0.09),
    ]);

    assert_eq!(decision.kind(), DecisionKind::Significant);
    assert_eq!(decision.winner(), Some("challenger"));
    // z ≈ 2.48, two-tailed p ≈ 0.013
    assert!(decision.confidence() > 0.98 && decision.confidence() < 0.99);
    assert!(decision.rationale().contains("challenger"));
}

#[test]
fn test_first_qualifying_challenger_wins() {
    let selector = WinnerSelector::new(100, 0.95);
    let decision = selector.select_from(&[
        record("control", 1000, 0.05),
        record("flat", 1000, 0.05),
        record("good", 1000, 0.09),
        record("better", 1000, 0.15),
    ]);

    // "better" has a larger lift but "good" qualifies first.
    assert_eq!(decision.winner(), Some("good"));
    assert_eq!(decision.comparisons().len(), 3);
}

#[test]
fn test_significant_loser_never_wins() {
    let selector = WinnerSelector::new(100, 0.95).with_fallback(false);
    let decision = selector.select_from(&[
        record("control", 2000, 0.10),
        record("worse", 2000, 0.04),
    ]);

    assert_eq!(decision.kind(), DecisionKind::NoDecision);
    assert_eq!(decision.winner(), None);
    match &decision.comparisons()[0].outcome {
        ComparisonOutcome::Tested { test, qualified } => {
            assert!(test.confidence >= 0.95);
            assert!(test.z_score < 0.0);
            assert!(!qualified);
        }
        other => panic!("expected a tested comparison, got {other:?}"),
    }
}

#[test]
fn test_threshold_is_inclusive() {
    let control = record("control", 500, 0.05);
    let challenger = record("challenger", 500, 0.09);
    let confidence = two_proportion_z_test(&control, &challenger)
        .unwrap()
        .confidence;

    let selector = WinnerSelector::new(100, confidence);
    let decision = selector.select(&control, &[challenger]);
    assert_eq!(decision.kind(), DecisionKind::Significant);
}

// ============================================================================
// Minimum sample gate
// ============================================================================

#[test]
fn test_small_challenger_is_not_tested() {
    let selector = WinnerSelector::new(100, 0.95).with_fallback(false);
    let decision = selector.select_from(&[
        record("control", 500, 0.05),
        record("tiny", 99, 0.50),
    ]);

    assert_eq!(decision.winner(), None);
    assert_eq!(
        decision.comparisons()[0].outcome,
        ComparisonOutcome::BelowMinimumSample {
            sample_size: 99,
            minimum: 100,
        }
    );
}

#[test]
fn test_small_control_does_not_block() {
    let selector = WinnerSelector::new(100, 0.95);
    let decision = selector.select_from(&[
        record("control", 50, 0.01),
        record("challenger", 2000, 0.20),
    ]);
    assert_eq!(decision.kind(), DecisionKind::Significant);
}

// ============================================================================
// Fallback and degenerate inputs
// ============================================================================

#[test]
fn test_best_performer_fallback() {
    let selector = WinnerSelector::new(100, 0.95);
    let decision = selector.select_from(&[
        record("control", 200, 0.050),
        record("a", 200, 0.055),
        record("b", 200, 0.060),
    ]);

    assert_eq!(decision.kind(), DecisionKind::BestPerformer);
    assert_eq!(decision.winner(), Some("b"));
    assert!(!decision.is_significant());
}

#[test]
fn test_fallback_can_pick_control() {
    let selector = WinnerSelector::new(100, 0.95);
    let decision = selector.select_from(&[
        record("control", 200, 0.07),
        record("a", 200, 0.06),
    ]);
    assert_eq!(decision.kind(), DecisionKind::BestPerformer);
    assert_eq!(decision.winner(), Some("control"));
}

#[test]
fn test_strict_config_disables_fallback() {
    let selector = WinnerSelector::from_config(&ExperimentConfig::strict());
    let decision = selector.select_from(&[
        record("control", 5000, 0.050),
        record("a", 5000, 0.052),
    ]);
    assert_eq!(decision.kind(), DecisionKind::NoDecision);
}

#[test]
fn test_all_zero_rates_are_skipped() {
    let selector = WinnerSelector::new(100, 0.95).with_fallback(false);
    let decision = selector.select_from(&[
        record("control", 500, 0.0),
        record("a", 500, 0.0),
    ]);
    assert_eq!(decision.comparisons()[0].outcome, ComparisonOutcome::Degenerate);
    assert_eq!(decision.winner(), None);
}

#[test]
fn test_fewer_than_two_records() {
    let selector = WinnerSelector::default();
    assert_eq!(selector.select_from(&[]).kind(), DecisionKind::NoDecision);
    assert_eq!(
        selector
            .select_from(&[record("control", 500, 0.05)])
            .kind(),
        DecisionKind::NoDecision
    );
}

#[test]
fn test_out_of_range_rate_rejected() {
    assert!(VariantMetricRecord::new("v", 100, 1.5).is_err());
    assert!(VariantMetricRecord::new("v", 100, -0.1).is_err());
    assert!(VariantMetricRecord::new("v", 100, f64::NAN).is_err());
}
