//! Model artifacts on disk
//!
//! An artifact bundles the fitted scaler and ensemble with the feature names
//! they were trained on, a `1.N.0` version, and training metadata. Artifacts
//! are JSON so they can be inspected and diffed.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::features::{FEATURE_COUNT, FEATURE_NAMES};
use super::model::GradientBoostedModel;
use super::scaler::StandardScaler;
use super::synthetic::{self, Dataset};
use super::training::{self, BoostingParams};
use crate::{Error, Result};

/// Version given to a freshly bootstrapped model.
pub const INITIAL_VERSION: &str = "1.0.0";

/// Fitted scaler and ensemble plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    version: String,
    trained_at: DateTime<Utc>,
    training_samples: usize,
    feature_names: Vec<String>,
    params: BoostingParams,
    scaler: StandardScaler,
    model: GradientBoostedModel,
}

impl ModelArtifact {
    /// Fit scaler and model on `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the data cannot be fitted.
    pub fn train(data: &Dataset, params: BoostingParams, version: impl Into<String>) -> Result<Self> {
        if data.rows.first().map(Vec::len) != Some(FEATURE_COUNT) {
            return Err(Error::InvalidInput(format!(
                "training rows must have {FEATURE_COUNT} features"
            )));
        }
        let scaler = StandardScaler::fit(&data.rows)?;
        let scaled = scaler.transform_all(&data.rows)?;
        let model = training::fit(&scaled, &data.targets, &params)?;

        Ok(Self {
            version: version.into(),
            trained_at: Utc::now(),
            training_samples: data.len(),
            feature_names: FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect(),
            params,
            scaler,
            model,
        })
    }

    /// Train the initial model on synthetic data.
    ///
    /// Holds out 20% of the rows and logs train/test R².
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `samples` is too small to fit.
    pub fn bootstrap(samples: usize, seed: u64) -> Result<Self> {
        let (train, test) = synthetic::generate(samples, seed).train_test_split(0.2, seed);
        let artifact = Self::train(&train, BoostingParams::default(), INITIAL_VERSION)?;

        let train_r2 = artifact.score(&train)?;
        let test_r2 = if test.is_empty() {
            f64::NAN
        } else {
            artifact.score(&test)?
        };
        info!(
            samples,
            train_r2,
            test_r2,
            "bootstrapped retention model"
        );
        Ok(artifact)
    }

    /// R² of the model on unscaled `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on shape mismatch.
    pub fn score(&self, data: &Dataset) -> Result<f64> {
        let scaled = self.scaler.transform_all(&data.rows)?;
        self.model.score(&scaled, &data.targets)
    }

    /// Load and validate an artifact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelNotLoaded`] if the file does not exist,
    /// [`Error::Json`] if it does not parse, and [`Error::ModelFormat`] if it
    /// does not match the current feature layout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::ModelNotLoaded(format!(
                "no artifact at {}",
                path.display()
            )));
        }
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;
        artifact.validate()?;
        info!(
            path = %path.display(),
            version = %artifact.version,
            "loaded retention model"
        );
        Ok(artifact)
    }

    /// Write the artifact as JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Json`] on failure.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), version = %self.version, "saved retention model");
        Ok(())
    }

    /// Check the artifact against the current feature layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFormat`] describing the mismatch.
    pub fn validate(&self) -> Result<()> {
        if self.feature_names.len() != FEATURE_COUNT
            || self
                .feature_names
                .iter()
                .zip(FEATURE_NAMES)
                .any(|(have, want)| have != want)
        {
            return Err(Error::ModelFormat(format!(
                "feature names {:?} do not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.model.n_features() != FEATURE_COUNT {
            return Err(Error::ModelFormat(format!(
                "model expects {} features, not {FEATURE_COUNT}",
                self.model.n_features()
            )));
        }
        self.scaler.validate(FEATURE_COUNT)?;
        self.model.validate()?;
        parse_minor(&self.version).map(|_| ())
    }

    /// Version following this one: minor bumped, patch reset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelFormat`] if the version is not `MAJOR.MINOR.PATCH`.
    pub fn next_version(&self) -> Result<String> {
        let (major, minor) = parse_minor(&self.version)?;
        Ok(format!("{major}.{}.0", minor + 1))
    }

    /// Get the version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Get the training timestamp.
    #[must_use]
    pub const fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Get the number of rows the model was fitted on.
    #[must_use]
    pub const fn training_samples(&self) -> usize {
        self.training_samples
    }

    /// Get the feature names in model order.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Get the boosting parameters.
    #[must_use]
    pub const fn params(&self) -> &BoostingParams {
        &self.params
    }

    /// Get the fitted scaler.
    #[must_use]
    pub const fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Get the fitted ensemble.
    #[must_use]
    pub const fn model(&self) -> &GradientBoostedModel {
        &self.model
    }
}

fn parse_minor(version: &str) -> Result<(u64, u64)> {
    let mut parts = version.split('.');
    let parsed = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(major), Some(minor), Some(patch), None) => major
            .parse::<u64>()
            .ok()
            .zip(minor.parse::<u64>().ok())
            .filter(|_| patch.parse::<u64>().is_ok()),
        _ => None,
    };
    parsed.ok_or_else(|| Error::ModelFormat(format!("bad model version {version:?}")))
}
