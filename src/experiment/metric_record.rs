//! Variant metric records - observed performance of one variant

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Observed sample size and success rate for one variant.
///
/// Immutable once constructed. Both construction paths ([`Self::new`] and
/// deserialization) validate, so every instance satisfies:
///
/// - `variant_id` is non-empty
/// - `success_rate` is finite and within `[0, 1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVariantMetricRecord")]
pub struct VariantMetricRecord {
    variant_id: String,
    sample_size: u64,
    success_rate: f64,
}

#[derive(Deserialize)]
struct RawVariantMetricRecord {
    variant_id: String,
    sample_size: u64,
    success_rate: f64,
}

impl TryFrom<RawVariantMetricRecord> for VariantMetricRecord {
    type Error = Error;

    fn try_from(raw: RawVariantMetricRecord) -> Result<Self> {
        Self::new(raw.variant_id, raw.sample_size, raw.success_rate)
    }
}

impl VariantMetricRecord {
    /// Create a validated metric record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the ID is empty or the rate is not a
    /// finite value in `[0, 1]`.
    pub fn new(variant_id: impl Into<String>, sample_size: u64, success_rate: f64) -> Result<Self> {
        let variant_id = variant_id.into();
        if variant_id.trim().is_empty() {
            return Err(Error::validation("variant_id must not be empty"));
        }
        if !success_rate.is_finite() || !(0.0..=1.0).contains(&success_rate) {
            return Err(Error::validation(format!(
                "success_rate for variant {variant_id} must be in [0, 1], got {success_rate}"
            )));
        }
        Ok(Self {
            variant_id,
            sample_size,
            success_rate,
        })
    }

    /// Get the variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the observed sample size.
    #[must_use]
    pub const fn sample_size(&self) -> u64 {
        self.sample_size
    }

    /// Get the observed success rate.
    #[must_use]
    pub const fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

/// Raw engagement metrics collected for a variant from an analytics source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    /// Number of views; used as the sample size
    pub views: u64,
    /// Engagements per view
    pub engagement_rate: f64,
    /// Fraction of views watched to the end
    pub completion_rate: f64,
    /// Shares per view
    pub share_rate: f64,
    /// Comments per view
    pub comment_rate: f64,
}

impl VariantMetrics {
    /// Project onto the engagement-rate record the winner selector consumes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the engagement rate is out of range.
    pub fn engagement_record(&self, variant_id: &str) -> Result<VariantMetricRecord> {
        VariantMetricRecord::new(variant_id, self.views, self.engagement_rate)
    }

    /// Metrics as a name → value map, views included.
    #[must_use]
    pub fn to_map(&self) -> std::collections::BTreeMap<String, f64> {
        [
            ("views", self.views as f64),
            ("engagement_rate", self.engagement_rate),
            ("completion_rate", self.completion_rate),
            ("share_rate", self.share_rate),
            ("comment_rate", self.comment_rate),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
