//! Variant generation strategies
//!
//! Video-like content gets two hook rewrites plus thumbnail variations; other
//! content is varied on hook text only. Randomized choices draw from an
//! injected RNG so callers can pin them in tests.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ExperimentConfig, Variant, VariantType};
use crate::{Error, Result};

/// Content types that get thumbnail variants in addition to hook variants.
const VIDEO_CONTENT_TYPES: [&str; 3] = ["video", "reel", "short"];

const THUMBNAIL_FRAME_SECONDS: [u32; 3] = [1, 3, 5];
const THUMBNAIL_EMOTIONS: [&str; 3] = ["surprise", "joy", "curiosity"];

/// Spacing between timing variants.
pub const TIMING_SLOT_MINUTES: u32 = 15;

/// The content asset an experiment is built around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentData {
    /// Content ID
    pub id: String,
    /// `video`, `reel`, `short`, or anything else
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Original hook text
    #[serde(default)]
    pub hook: String,
    /// Requested variant count; clamped to 2..=4
    #[serde(default)]
    pub variant_count: Option<usize>,
}

fn default_content_type() -> String {
    "video".to_string()
}

impl ContentData {
    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the content ID is blank.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::validation("content_data.id must not be empty"));
        }
        Ok(())
    }

    fn is_video(&self) -> bool {
        VIDEO_CONTENT_TYPES.contains(&self.content_type.as_str())
    }
}

type HookStrategy = fn(&str) -> String;

/// Hook rewrites, applied in order.
const HOOK_STRATEGIES: [HookStrategy; 4] = [exclaim, siren, shout, disbelief];

fn exclaim(hook: &str) -> String {
    hook.replace('?', "!")
}

fn siren(hook: &str) -> String {
    format!("🚨 {hook}")
}

fn shout(hook: &str) -> String {
    let caps: String = hook.to_uppercase().chars().take(30).collect();
    format!("{caps}...")
}

fn disbelief(hook: &str) -> String {
    format!("You won't believe {}", hook.to_lowercase())
}

/// Generate the variant set for `content` under `config`.
pub fn generate_variants<R: Rng>(
    content: &ContentData,
    config: &ExperimentConfig,
    rng: &mut R,
) -> Vec<Variant> {
    let count = config.variant_count;
    let mut variants = if content.is_video() {
        let mut v = hook_variants(content, 2);
        v.extend(thumbnail_variants(content, count.saturating_sub(2), rng));
        v
    } else {
        hook_variants(content, count)
    };
    variants.truncate(count);
    variants
}

/// Variants for one variant type.
pub fn variants_of_type<R: Rng>(
    variant_type: VariantType,
    content: &ContentData,
    count: usize,
    rng: &mut R,
) -> Vec<Variant> {
    match variant_type {
        VariantType::Hook => hook_variants(content, count),
        VariantType::Thumbnail => thumbnail_variants(content, count, rng),
        VariantType::Timing => timing_variants(content, count),
        // Audio swaps come from the trending-audio pipeline, not generated here.
        VariantType::Audio => Vec::new(),
    }
}

/// Hook text rewrites. At most one per strategy.
#[must_use]
pub fn hook_variants(content: &ContentData, count: usize) -> Vec<Variant> {
    HOOK_STRATEGIES
        .iter()
        .take(count)
        .enumerate()
        .map(|(i, strategy)| {
            Variant::new(
                &content.id,
                VariantType::Hook,
                json!({
                    "hook_text": strategy(&content.hook),
                    "strategy": format!("hook_strategy_{i}"),
                }),
            )
        })
        .collect()
}

/// Thumbnail variations: frame time, overlay, and target emotion.
pub fn thumbnail_variants<R: Rng>(
    content: &ContentData,
    count: usize,
    rng: &mut R,
) -> Vec<Variant> {
    (0..count)
        .map(|_| {
            let frame_second = THUMBNAIL_FRAME_SECONDS.choose(&mut *rng).copied().unwrap_or(1);
            let emotion = THUMBNAIL_EMOTIONS.choose(&mut *rng).copied().unwrap_or("surprise");
            Variant::new(
                &content.id,
                VariantType::Thumbnail,
                json!({
                    "frame_second": frame_second,
                    "overlay_text": rng.gen_bool(0.5),
                    "emotion_target": emotion,
                }),
            )
        })
        .collect()
}

/// Publish-time variants spaced [`TIMING_SLOT_MINUTES`] apart.
#[must_use]
pub fn timing_variants(content: &ContentData, count: usize) -> Vec<Variant> {
    (0..count)
        .map(|i| {
            Variant::new(
                &content.id,
                VariantType::Timing,
                json!({
                    "publish_offset_minutes": i as u32 * TIMING_SLOT_MINUTES,
                    "slot": format!("slot_{i}"),
                }),
            )
        })
        .collect()
}
