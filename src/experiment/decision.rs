//! Experiment decisions produced by the winner selector

use serde::{Deserialize, Serialize};

use super::TwoProportionTest;

/// How a decision was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    /// A challenger beat control at the configured confidence.
    Significant,
    /// Nothing was significant; the highest raw rate was picked without
    /// statistical backing. A soft call, not a guarantee.
    BestPerformer,
    /// No winner could be named.
    NoDecision,
}

impl DecisionKind {
    /// Get the kind name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Significant => "significant",
            Self::BestPerformer => "best_performer",
            Self::NoDecision => "no_decision",
        }
    }
}

/// Why a challenger was or was not compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// Sample size below the configured minimum
    BelowMinimumSample {
        /// Observed sample size
        sample_size: u64,
        /// Required sample size
        minimum: u64,
    },
    /// Standard error was zero or undefined; comparison skipped
    Degenerate,
    /// Test ran
    Tested {
        /// Test statistics
        test: TwoProportionTest,
        /// Whether this challenger qualified as winner
        qualified: bool,
    },
}

/// Per-challenger record of what the selector did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengerComparison {
    /// Challenger variant ID
    pub variant_id: String,
    /// What happened
    pub outcome: ComparisonOutcome,
}

impl ChallengerComparison {
    /// Confidence computed for this challenger, if it was tested.
    #[must_use]
    pub fn confidence(&self) -> Option<f64> {
        match &self.outcome {
            ComparisonOutcome::Tested { test, .. } => Some(test.confidence),
            _ => None,
        }
    }
}

/// Result of winner selection over one control and its challengers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentDecision {
    winner: Option<String>,
    confidence: f64,
    kind: DecisionKind,
    rationale: String,
    comparisons: Vec<ChallengerComparison>,
}

impl ExperimentDecision {
    pub(crate) fn new(
        winner: Option<String>,
        confidence: f64,
        kind: DecisionKind,
        rationale: String,
        comparisons: Vec<ChallengerComparison>,
    ) -> Self {
        Self {
            winner,
            confidence: confidence.clamp(0.0, 1.0),
            kind,
            rationale,
            comparisons,
        }
    }

    pub(crate) fn no_decision(rationale: impl Into<String>) -> Self {
        Self::new(
            None,
            0.0,
            DecisionKind::NoDecision,
            rationale.into(),
            Vec::new(),
        )
    }

    /// Winning variant ID, if any.
    #[must_use]
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// Confidence level in `[0, 1]` attached to the winner.
    #[must_use]
    pub const fn confidence(&self) -> f64 {
        self.confidence
    }

    /// How the decision was reached.
    #[must_use]
    pub const fn kind(&self) -> DecisionKind {
        self.kind
    }

    /// True only for a statistically validated winner.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.kind == DecisionKind::Significant
    }

    /// Human-readable explanation.
    #[must_use]
    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Comparisons performed, in challenger input order.
    #[must_use]
    pub fn comparisons(&self) -> &[ChallengerComparison] {
        &self.comparisons
    }
}
