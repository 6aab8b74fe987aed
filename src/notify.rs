//! Notification delivery for finished experiments.
//!
//! The experiment manager publishes one message per completed experiment to a
//! named stream. Delivery (webhooks, Redis streams, chat) belongs to the
//! caller; this module only defines the seam and an in-memory sink.

use crate::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Stream the experiment manager publishes to.
pub const NOTIFICATION_STREAM: &str = "mcp:notifications";

/// A message appended to a notification stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Message type, e.g. `experiment_complete`
    #[serde(rename = "type")]
    pub kind: String,
    /// Message body
    pub payload: serde_json::Value,
}

/// Sink for outbound notifications.
pub trait NotificationSink: Send + Sync {
    /// Append `notification` to `stream`.
    fn publish(&self, stream: &str, notification: Notification) -> Result<()>;
}

/// Sink that keeps every message in memory, grouped by stream.
#[derive(Debug, Default)]
pub struct MemorySink {
    streams: DashMap<String, Vec<Notification>>,
}

impl MemorySink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published to `stream`, oldest first.
    #[must_use]
    pub fn messages(&self, stream: &str) -> Vec<Notification> {
        self.streams
            .get(stream)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for MemorySink {
    fn publish(&self, stream: &str, notification: Notification) -> Result<()> {
        tracing::debug!(stream, kind = %notification.kind, "publishing notification");
        self.streams
            .entry(stream.to_string())
            .or_default()
            .push(notification);
        Ok(())
    }
}
