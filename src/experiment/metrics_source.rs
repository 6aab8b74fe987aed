//! Sources of per-variant metrics
//!
//! Production deployments query platform analytics; the implementations here
//! cover replay (fixed maps) and local simulation.

use std::collections::HashMap;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::VariantMetrics;
use crate::{Error, Result};

/// Baseline engagement rate assumed by the simulator and the lift report.
pub const BASELINE_ENGAGEMENT_RATE: f64 = 0.05;

const BASELINE_COMPLETION_RATE: f64 = 0.65;
const BASELINE_SHARE_RATE: f64 = 0.02;
const BASELINE_COMMENT_RATE: f64 = 0.01;

/// Supplies observed metrics for a variant.
pub trait MetricsSource: Send + Sync {
    /// Collect current metrics for `variant_id`.
    fn collect(&self, variant_id: &str) -> Result<VariantMetrics>;
}

/// Metrics looked up from a fixed map.
#[derive(Debug, Default, Clone)]
pub struct FixedMetricsSource {
    metrics: HashMap<String, VariantMetrics>,
}

impl FixedMetricsSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register metrics for a variant.
    #[must_use]
    pub fn with(mut self, variant_id: impl Into<String>, metrics: VariantMetrics) -> Self {
        self.metrics.insert(variant_id.into(), metrics);
        self
    }
}

impl MetricsSource for FixedMetricsSource {
    fn collect(&self, variant_id: &str) -> Result<VariantMetrics> {
        self.metrics
            .get(variant_id)
            .copied()
            .ok_or_else(|| Error::InvalidInput(format!("no metrics recorded for variant {variant_id}")))
    }
}

/// Seeded simulator producing plausible short-form engagement numbers.
///
/// Views in `100..=1000`, engagement around a 5% baseline (-2/+3 points),
/// completion around 65%, share around 2%, comment around 1%.
#[derive(Debug)]
pub struct SimulatedMetricsSource {
    rng: Mutex<StdRng>,
}

impl SimulatedMetricsSource {
    /// Create a simulator with a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl MetricsSource for SimulatedMetricsSource {
    fn collect(&self, _variant_id: &str) -> Result<VariantMetrics> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| Error::Internal("metrics simulator poisoned".to_string()))?;
        Ok(VariantMetrics {
            views: rng.gen_range(100..=1000),
            engagement_rate: (BASELINE_ENGAGEMENT_RATE + rng.gen_range(-0.02..0.03)).max(0.0),
            completion_rate: (BASELINE_COMPLETION_RATE + rng.gen_range(-0.1..0.15)).max(0.0),
            share_rate: (BASELINE_SHARE_RATE + rng.gen_range(-0.01..0.02)).max(0.0),
            comment_rate: (BASELINE_COMMENT_RATE + rng.gen_range(-0.005..0.01)).max(0.0),
        })
    }
}
