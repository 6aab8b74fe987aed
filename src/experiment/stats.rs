// Two-proportion z-test for comparing variant engagement rates.
//
// The pooled test assumes both groups share a success probability under H0:
//
//   p  = (r1*n1 + r2*n2) / (n1 + n2)
//   se = sqrt(p * (1 - p) * (1/n1 + 1/n2))
//   z  = (r2 - r1) / se
//   p-value (two-tailed) = 2 * (1 - Phi(|z|))
//
// Phi is evaluated through the Abramowitz & Stegun 7.1.26 erf approximation,
// absolute error below 1.5e-7 across the real line.

use serde::{Deserialize, Serialize};

use super::VariantMetricRecord;

/// Outcome of one control-vs-challenger comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoProportionTest {
    /// Pooled success proportion under H0
    pub pooled_rate: f64,
    /// Standard error of the rate difference
    pub standard_error: f64,
    /// z-statistic, positive when the challenger rate is higher
    pub z_score: f64,
    /// Two-tailed p-value
    pub p_value: f64,
    /// `1 - p_value`
    pub confidence: f64,
}

/// Run the pooled two-proportion z-test of `challenger` against `control`.
///
/// Returns `None` for degenerate inputs: a zero or non-finite standard error
/// (both rates 0 or 1, an empty control sample). Callers skip such
/// comparisons instead of failing.
///
/// # Example
/// ```
/// use engagement_lab::experiment::{two_proportion_z_test, VariantMetricRecord};
///
/// let control = VariantMetricRecord::new("a", 500, 0.05).unwrap();
/// let challenger = VariantMetricRecord::new("b", 500, 0.09).unwrap();
///
/// let test = two_proportion_z_test(&control, &challenger).unwrap();
/// assert!(test.confidence >= 0.95);
/// ```
#[must_use]
pub fn two_proportion_z_test(
    control: &VariantMetricRecord,
    challenger: &VariantMetricRecord,
) -> Option<TwoProportionTest> {
    let n1 = control.sample_size() as f64;
    let n2 = challenger.sample_size() as f64;
    let r1 = control.success_rate();
    let r2 = challenger.success_rate();

    if n1 + n2 == 0.0 {
        return None;
    }

    let pooled_rate = (r1 * n1 + r2 * n2) / (n1 + n2);
    let standard_error = (pooled_rate * (1.0 - pooled_rate) * (1.0 / n1 + 1.0 / n2)).sqrt();
    if !standard_error.is_finite() || standard_error <= 0.0 {
        return None;
    }

    let z_score = (r2 - r1) / standard_error;
    let p_value = (2.0 * (1.0 - normal_cdf(z_score.abs()))).clamp(0.0, 1.0);

    Some(TwoProportionTest {
        pooled_rate,
        standard_error,
        z_score,
        p_value,
        confidence: 1.0 - p_value,
    })
}

/// Standard normal cumulative distribution function.
#[must_use]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function (Abramowitz & Stegun 7.1.26).
#[must_use]
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}
