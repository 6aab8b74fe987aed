//! Video metadata accepted by the retention predictor

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Shortest accepted video.
pub const MIN_DURATION_SECONDS: u32 = 5;
/// Longest accepted video.
pub const MAX_DURATION_SECONDS: u32 = 300;

/// Publishing platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// TikTok
    TikTok,
    /// Instagram Reels
    Instagram,
    /// YouTube Shorts
    YouTube,
    /// Twitter / X video
    Twitter,
}

impl Platform {
    /// All platforms in one-hot feature order.
    pub const ALL: [Self; 4] = [Self::TikTok, Self::Instagram, Self::YouTube, Self::Twitter];

    /// Get the platform name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TikTok => "tiktok",
            Self::Instagram => "instagram",
            Self::YouTube => "youtube",
            Self::Twitter => "twitter",
        }
    }

    /// Music energy below this level draws a suggestion on this platform.
    #[must_use]
    pub const fn energy_floor(&self) -> Option<f64> {
        match self {
            Self::TikTok => Some(0.6),
            _ => None,
        }
    }
}

/// Content metadata for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video ID
    pub video_id: String,
    /// Length in seconds (5..=300)
    pub duration_seconds: u32,
    /// Target platform
    pub platform: Platform,
    /// Free-form content category
    pub content_type: String,
    /// Opening hook text
    pub hook_text: String,
    /// Transcript of the first three seconds
    pub first_3_seconds_transcript: String,
    /// Cuts in the first five seconds
    #[serde(default = "default_scene_changes")]
    pub scene_changes_first_5s: u32,
    /// On-screen text overlays
    #[serde(default)]
    pub text_overlay_count: u32,
    /// Music energy in [0, 1]
    #[serde(default = "default_music_energy")]
    pub music_energy_level: f64,
    /// Whether a face appears
    #[serde(default)]
    pub faces_detected: bool,
    /// Dominant emotion label, if detected
    #[serde(default)]
    pub emotion_detected: Option<String>,
    /// Number of hashtags
    #[serde(default)]
    pub hashtag_count: u32,
}

const fn default_scene_changes() -> u32 {
    1
}

const fn default_music_energy() -> f64 {
    0.5
}

impl VideoMetadata {
    /// Check ranges the type system does not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.video_id.trim().is_empty() {
            return Err(Error::validation("video_id must not be empty"));
        }
        if !(MIN_DURATION_SECONDS..=MAX_DURATION_SECONDS).contains(&self.duration_seconds) {
            return Err(Error::Validation(format!(
                "duration_seconds must be in [{MIN_DURATION_SECONDS}, {MAX_DURATION_SECONDS}], got {}",
                self.duration_seconds
            )));
        }
        if !(0.0..=1.0).contains(&self.music_energy_level) {
            return Err(Error::Validation(format!(
                "music_energy_level must be in [0, 1], got {}",
                self.music_energy_level
            )));
        }
        Ok(())
    }

    /// Whitespace-separated words in the hook.
    #[must_use]
    pub fn hook_word_count(&self) -> usize {
        self.hook_text.split_whitespace().count()
    }
}
