//! Feature extraction for the retention model
//!
//! The model sees exactly [`FEATURE_COUNT`] values in [`FEATURE_NAMES`] order.
//! Artifacts record the names they were trained on and are rejected when the
//! list differs.

use serde::{Deserialize, Serialize};

use super::{Platform, VideoMetadata};
use crate::{Error, Result};

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 13;

/// Model inputs, in order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "duration_seconds",
    "scene_changes_per_second",
    "text_overlay_density",
    "music_energy_level",
    "has_faces",
    "emotion_score",
    "hashtag_density",
    "hook_length",
    "transcript_complexity",
    "platform_tiktok",
    "platform_instagram",
    "platform_youtube",
    "platform_twitter",
];

/// Hashtag count treated as full density.
const HASHTAG_SATURATION: f64 = 30.0;

/// Fixed-order model input.
///
/// # Example
/// ```
/// use engagement_lab::retention::{FeatureVector, FEATURE_COUNT};
///
/// let features = FeatureVector::new([0.0; FEATURE_COUNT]).unwrap();
/// assert_eq!(features.get("hook_length"), Some(0.0));
/// assert!(FeatureVector::new([f64::NAN; FEATURE_COUNT]).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; FEATURE_COUNT]", into = "[f64; FEATURE_COUNT]")]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl TryFrom<[f64; FEATURE_COUNT]> for FeatureVector {
    type Error = Error;

    fn try_from(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        Self::new(values)
    }
}

impl From<FeatureVector> for [f64; FEATURE_COUNT] {
    fn from(features: FeatureVector) -> Self {
        features.values
    }
}

impl FeatureVector {
    /// Wrap raw values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any value is NaN or infinite.
    pub fn new(values: [f64; FEATURE_COUNT]) -> Result<Self> {
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::Validation(format!(
                "feature {} is not finite: {}",
                FEATURE_NAMES[i], values[i]
            )));
        }
        Ok(Self { values })
    }

    /// Extract features from validated metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the metadata is out of range.
    pub fn from_metadata(metadata: &VideoMetadata) -> Result<Self> {
        metadata.validate()?;

        let duration = f64::from(metadata.duration_seconds);
        let mut values = [
            duration,
            f64::from(metadata.scene_changes_first_5s) / 5.0,
            f64::from(metadata.text_overlay_count) / duration * 60.0,
            metadata.music_energy_level,
            if metadata.faces_detected { 1.0 } else { 0.0 },
            emotion_score(metadata.emotion_detected.as_deref()),
            f64::from(metadata.hashtag_count) / HASHTAG_SATURATION,
            metadata.hook_word_count() as f64,
            transcript_complexity(&metadata.first_3_seconds_transcript),
            0.0,
            0.0,
            0.0,
            0.0,
        ];
        values[9..].copy_from_slice(&platform_one_hot(metadata.platform));

        Self::new(values)
    }

    /// Values in [`FEATURE_NAMES`] order.
    #[must_use]
    pub const fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    /// Look up a value by feature name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }
}

/// One-hot encoding in [`Platform::ALL`] order.
#[must_use]
pub fn platform_one_hot(platform: Platform) -> [f64; 4] {
    Platform::ALL.map(|p| if p == platform { 1.0 } else { 0.0 })
}

/// Score an emotion label; unknown labels score 0.5, missing ones 0.
#[must_use]
pub fn emotion_score(emotion: Option<&str>) -> f64 {
    let Some(label) = emotion.filter(|e| !e.is_empty()) else {
        return 0.0;
    };
    match label.to_lowercase().as_str() {
        "joy" => 0.9,
        "surprise" | "excitement" => 0.85,
        "curiosity" => 0.8,
        "sadness" => 0.3,
        "anger" => 0.4,
        _ => 0.5,
    }
}

/// Mean word length over ten, capped at 1. Empty text scores 0.
#[must_use]
pub fn transcript_complexity(text: &str) -> f64 {
    let (words, chars) = text
        .split_whitespace()
        .fold((0usize, 0usize), |(w, c), word| (w + 1, c + word.chars().count()));
    if words == 0 {
        return 0.0;
    }
    (chars as f64 / words as f64 / 10.0).min(1.0)
}
