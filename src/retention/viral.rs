//! Viral probability score

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Scores at or above this are worth publishing as-is.
pub const PROCEED_THRESHOLD: f64 = 50.0;

const MAX_SCORE: f64 = 100.0;
const RETENTION_WEIGHT: f64 = 50.0;

/// Early performance after the first hour live. Missing rates count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstHourMetrics {
    /// Engagements per view
    pub engagement_rate: f64,
    /// Shares per view
    pub share_rate: f64,
    /// Comments per view
    pub comment_rate: f64,
}

impl FirstHourMetrics {
    /// Check every rate is a finite value in [0, 1].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first bad rate.
    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("engagement_rate", self.engagement_rate),
            ("share_rate", self.share_rate),
            ("comment_rate", self.comment_rate),
        ] {
            if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                return Err(Error::Validation(format!(
                    "first_hour_metrics.{name} must be in [0, 1], got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// What to do with a scored video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    /// Publish / boost
    Proceed,
    /// Hold for manual review
    Review,
}

impl Recommendation {
    /// Recommendation for a score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= PROCEED_THRESHOLD {
            Self::Proceed
        } else {
            Self::Review
        }
    }
}

/// Combine predicted retention with first-hour metrics into a 0-100 score.
///
/// Retention carries 50 points; engagement (saturating at 10%) and shares
/// (at 5%) 20 each; comments (at 2%) 10. Inputs are expected to be
/// validated; see [`FirstHourMetrics::validate`].
///
/// # Example
/// ```
/// use engagement_lab::retention::{viral_score, FirstHourMetrics};
///
/// let early = FirstHourMetrics { engagement_rate: 0.05, share_rate: 0.05, comment_rate: 0.0 };
/// assert!((viral_score(0.6, Some(&early)) - 60.0).abs() < 1e-9);
/// assert!((viral_score(0.6, None) - 30.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn viral_score(retention: f64, first_hour: Option<&FirstHourMetrics>) -> f64 {
    let mut score = retention * RETENTION_WEIGHT;
    if let Some(m) = first_hour {
        score += saturate(m.engagement_rate, 0.1) * 20.0
            + saturate(m.share_rate, 0.05) * 20.0
            + saturate(m.comment_rate, 0.02) * 10.0;
    }
    score.min(MAX_SCORE)
}

fn saturate(rate: f64, full_at: f64) -> f64 {
    (rate / full_at).min(1.0)
}
