//! Variant - one A/B-tested alternative of a content asset

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a variant changes relative to the original asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantType {
    /// Opening hook text
    Hook,
    /// Cover frame / thumbnail
    Thumbnail,
    /// Audio track
    Audio,
    /// Publish time
    Timing,
}

impl VariantType {
    /// Get the type name as string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hook => "hook",
            Self::Thumbnail => "thumbnail",
            Self::Audio => "audio",
            Self::Timing => "timing",
        }
    }
}

/// A generated variant and the changes it applies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Variant {
    variant_id: String,
    parent_id: String,
    variant_type: VariantType,
    changes: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl Variant {
    /// Create a variant with a fresh UUID and the current timestamp.
    #[must_use]
    pub fn new(
        parent_id: impl Into<String>,
        variant_type: VariantType,
        changes: serde_json::Value,
    ) -> Self {
        Self {
            variant_id: Uuid::new_v4().to_string(),
            parent_id: parent_id.into(),
            variant_type,
            changes,
            created_at: Utc::now(),
        }
    }

    /// Get the variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the parent content ID.
    #[must_use]
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// Get the variant type.
    #[must_use]
    pub const fn variant_type(&self) -> VariantType {
        self.variant_type
    }

    /// Get the applied changes.
    #[must_use]
    pub const fn changes(&self) -> &serde_json::Value {
        &self.changes
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
