//! Optimization suggestions for under-performing videos

use super::{Platform, VideoMetadata};

/// Most suggestions returned for one video.
pub const MAX_SUGGESTIONS: usize = 5;

/// Estimates at or above this get the "optimized" status message.
const HIGH_RETENTION: f64 = 0.8;

const MAX_DURATION_SECONDS: u32 = 60;
const MAX_HOOK_WORDS: usize = 15;
const MIN_OPENING_CUTS: u32 = 2;
const MAX_TEXT_OVERLAYS: u32 = 5;

type Rule = fn(&VideoMetadata) -> Option<&'static str>;

/// Rules in output order. Each fires independently.
const RULES: [Rule; 6] = [too_long, long_hook, slow_opening, no_faces, low_energy, overlays];

fn too_long(m: &VideoMetadata) -> Option<&'static str> {
    (m.duration_seconds > MAX_DURATION_SECONDS)
        .then_some("Consider shortening video to under 60 seconds for better retention")
}

fn long_hook(m: &VideoMetadata) -> Option<&'static str> {
    (m.hook_word_count() > MAX_HOOK_WORDS)
        .then_some("Tighten first 2 seconds - hook text is too long")
}

fn slow_opening(m: &VideoMetadata) -> Option<&'static str> {
    (m.scene_changes_first_5s < MIN_OPENING_CUTS)
        .then_some("Add more dynamic cuts in first 5 seconds to maintain attention")
}

fn no_faces(m: &VideoMetadata) -> Option<&'static str> {
    (!m.faces_detected).then_some("Consider adding human faces for emotional connection")
}

fn low_energy(m: &VideoMetadata) -> Option<&'static str> {
    let floor = m.platform.energy_floor()?;
    if m.music_energy_level >= floor {
        return None;
    }
    Some(match m.platform {
        Platform::TikTok => "Use higher energy trending audio for TikTok audience",
        _ => "Use higher energy audio for this platform",
    })
}

fn overlays(m: &VideoMetadata) -> Option<&'static str> {
    match m.text_overlay_count {
        0 => Some("Add text overlays to reinforce key points"),
        n if n > MAX_TEXT_OVERLAYS => Some("Reduce text overlays to avoid overwhelming viewers"),
        _ => None,
    }
}

/// Suggestions for `metadata` given its estimate.
///
/// Rules only run below `threshold`. When none fire, a single status
/// message is returned instead.
#[must_use]
pub fn suggestions(metadata: &VideoMetadata, estimate: f64, threshold: f64) -> Vec<String> {
    let mut out: Vec<String> = if estimate < threshold {
        RULES
            .iter()
            .filter_map(|rule| rule(metadata))
            .take(MAX_SUGGESTIONS)
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };

    if out.is_empty() {
        let status = if estimate >= HIGH_RETENTION {
            "Content is optimized for high retention - maintain current approach"
        } else {
            "Content is performing adequately - minor optimizations may help"
        };
        out.push(status.to_string());
    }
    out
}
