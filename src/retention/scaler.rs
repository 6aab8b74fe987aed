//! Standard scaler (zero mean, unit variance per column)
//!
//! Fitting is delegated to aprender; the fitted mean and scale are kept as
//! `f64` so they serialize with the model artifact and apply to one row at a
//! time without building a matrix.

use aprender::preprocessing::StandardScaler as AprenderScaler;
use aprender::primitives::Matrix;
use aprender::traits::Transformer;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Per-feature standardization fitted on a training matrix.
///
/// Constant columns get a scale of 1 so they map to zero instead of dividing
/// by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or ragged matrix, or if
    /// aprender rejects the data.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let n_features = rows
            .first()
            .map(Vec::len)
            .ok_or_else(|| Error::InvalidInput("cannot fit scaler on zero rows".to_string()))?;
        if let Some(bad) = rows.iter().position(|r| r.len() != n_features) {
            return Err(Error::InvalidInput(format!(
                "row {bad} has {} features, expected {n_features}",
                rows[bad].len()
            )));
        }

        #[allow(clippy::cast_possible_truncation)]
        let data: Vec<f32> = rows.iter().flatten().map(|&v| v as f32).collect();
        let matrix = Matrix::from_vec(rows.len(), n_features, data)
            .map_err(|e| Error::InvalidInput(format!("scaler input: {e}")))?;

        let mut fitted = AprenderScaler::new().with_mean(true).with_std(true);
        fitted
            .fit(&matrix)
            .map_err(|e| Error::InvalidInput(format!("scaler fit failed: {e}")))?;

        let mean = fitted.mean().iter().map(|&m| f64::from(m)).collect();
        let scale = fitted
            .std()
            .iter()
            .map(|&s| {
                let s = f64::from(s);
                if s.is_finite() && s > 0.0 {
                    s
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    /// Number of features the scaler was fitted on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Column means.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Column scales.
    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Standardize one sample.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the width differs from the fit.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(Error::InvalidInput(format!(
                "expected {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }

    /// Standardize every sample.
    ///
    /// # Errors
    ///
    /// Returns the first width mismatch.
    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    pub(crate) fn validate(&self, n_features: usize) -> Result<()> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(Error::ModelFormat(format!(
                "scaler has {}/{} columns, expected {n_features}",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0)
            || self.mean.iter().any(|m| !m.is_finite())
        {
            return Err(Error::ModelFormat(
                "scaler parameters must be finite with positive scale".to_string(),
            ));
        }
        Ok(())
    }
}
