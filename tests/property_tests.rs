//! Property-based tests for winner selection and retention estimation

use std::sync::OnceLock;

use engagement_lab::experiment::{
    normal_cdf, two_proportion_z_test, ComparisonOutcome, DecisionKind, VariantMetricRecord,
    WinnerSelector,
};
use engagement_lab::retention::{
    suggestions, synthetic, BoostingParams, FeatureVector, ModelArtifact, Platform,
    RetentionEstimator, RiskTier, VideoMetadata, INITIAL_VERSION, MAX_SUGGESTIONS,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_record(id: &'static str) -> impl Strategy<Value = VariantMetricRecord> {
    (0u64..5_000, 0.0f64..=1.0)
        .prop_map(move |(n, rate)| VariantMetricRecord::new(id, n, rate).unwrap())
}

fn arb_platform() -> impl Strategy<Value = Platform> {
    prop::sample::select(Platform::ALL.to_vec())
}

fn arb_metadata() -> impl Strategy<Value = VideoMetadata> {
    (
        5u32..=300,
        arb_platform(),
        prop::collection::vec("[a-z]{1,8}", 0..25),
        0u32..10,
        0u32..10,
        0.0f64..=1.0,
        any::<bool>(),
        prop::option::of(prop::sample::select(vec!["joy", "surprise", "anger", "calm"])),
        0u32..30,
    )
        .prop_map(
            |(duration, platform, hook, cuts, overlays, energy, faces, emotion, hashtags)| {
                VideoMetadata {
                    video_id: "prop-video".to_string(),
                    duration_seconds: duration,
                    platform,
                    content_type: "mixed".to_string(),
                    hook_text: hook.join(" "),
                    first_3_seconds_transcript: "quick intro to the topic".to_string(),
                    scene_changes_first_5s: cuts,
                    text_overlay_count: overlays,
                    music_energy_level: energy,
                    faces_detected: faces,
                    emotion_detected: emotion.map(str::to_string),
                    hashtag_count: hashtags,
                }
            },
        )
}

fn estimator() -> &'static RetentionEstimator {
    static ESTIMATOR: OnceLock<RetentionEstimator> = OnceLock::new();
    ESTIMATOR.get_or_init(|| {
        let params = BoostingParams {
            n_estimators: 25,
            ..BoostingParams::default()
        };
        let artifact =
            ModelArtifact::train(&synthetic::generate(400, 42), params, INITIAL_VERSION).unwrap();
        RetentionEstimator::new(artifact)
    })
}

// ============================================================================
// Winner selection properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_confidence_in_unit_interval(control in arb_record("c"), challenger in arb_record("b")) {
        if let Some(test) = two_proportion_z_test(&control, &challenger) {
            prop_assert!((0.0..=1.0).contains(&test.confidence));
            prop_assert!((0.0..=1.0).contains(&test.p_value));
            prop_assert!(test.standard_error > 0.0);
        }
    }

    #[test]
    fn prop_selection_is_deterministic(
        control in arb_record("c"),
        a in arb_record("a"),
        b in arb_record("b"),
    ) {
        let selector = WinnerSelector::new(100, 0.95);
        let first = selector.select(&control, &[a.clone(), b.clone()]);
        let second = selector.select(&control, &[a, b]);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_small_challenger_never_significant(
        control in arb_record("c"),
        n in 0u64..100,
        rate in 0.0f64..=1.0,
    ) {
        let challenger = VariantMetricRecord::new("small", n, rate).unwrap();
        let decision = WinnerSelector::new(100, 0.95).with_fallback(false).select(&control, &[challenger]);
        prop_assert_eq!(decision.winner(), None);
        let is_below_minimum = matches!(
            decision.comparisons()[0].outcome,
            ComparisonOutcome::BelowMinimumSample { .. }
        );
        prop_assert!(is_below_minimum);
    }

    #[test]
    fn prop_significant_winner_beats_control(
        control in arb_record("c"),
        a in arb_record("a"),
        b in arb_record("b"),
    ) {
        let decision = WinnerSelector::new(100, 0.95).select(&control, &[a.clone(), b.clone()]);
        if decision.kind() == DecisionKind::Significant {
            let winner = if decision.winner() == Some("a") { &a } else { &b };
            prop_assert!(winner.success_rate() > control.success_rate());
            prop_assert!(winner.sample_size() >= 100);
            prop_assert!(decision.confidence() >= 0.95);
        }
    }

    #[test]
    fn prop_large_lift_wins(base in 0.01f64..0.2, n in 1_000u64..5_000) {
        let control = VariantMetricRecord::new("c", n, base).unwrap();
        let challenger = VariantMetricRecord::new("b", n, base * 2.0 + 0.05).unwrap();
        let decision = WinnerSelector::new(100, 0.95).select(&control, &[challenger]);
        prop_assert_eq!(decision.kind(), DecisionKind::Significant);
        prop_assert_eq!(decision.winner(), Some("b"));
    }

    #[test]
    fn prop_normal_cdf_monotonic(x in -8.0f64..8.0, dx in 0.0f64..4.0) {
        prop_assert!(normal_cdf(x) <= normal_cdf(x + dx) + 1e-12);
    }
}

// ============================================================================
// Retention properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_estimate_bounded_and_inside_interval(metadata in arb_metadata()) {
        let features = FeatureVector::from_metadata(&metadata).unwrap();
        let estimate = estimator().estimate(&features).unwrap();

        let (lower, upper) = estimate.confidence_interval;
        prop_assert!((0.0..=1.0).contains(&estimate.estimate));
        prop_assert!(0.0 <= lower && lower <= estimate.estimate);
        prop_assert!(estimate.estimate <= upper && upper <= 1.0);
        prop_assert_eq!(
            estimate.risk_tier,
            RiskTier::classify(estimate.estimate, estimator().threshold())
        );
    }

    #[test]
    fn prop_estimate_is_deterministic(metadata in arb_metadata()) {
        let features = FeatureVector::from_metadata(&metadata).unwrap();
        let first = estimator().estimate(&features).unwrap();
        let second = estimator().estimate(&features).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_suggestions_bounded(metadata in arb_metadata(), estimate in 0.0f64..=1.0) {
        let tips = suggestions(&metadata, estimate, 0.65);
        prop_assert!(!tips.is_empty());
        prop_assert!(tips.len() <= MAX_SUGGESTIONS);
        if estimate >= 0.65 {
            prop_assert_eq!(tips.len(), 1);
        }
    }

    #[test]
    fn prop_risk_tier_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |t: RiskTier| match t {
            RiskTier::High => 0,
            RiskTier::Medium => 1,
            RiskTier::Low => 2,
        };
        prop_assert!(rank(RiskTier::classify(lo, 0.65)) <= rank(RiskTier::classify(hi, 0.65)));
    }
}
