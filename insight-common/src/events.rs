//! User-visible notices
//!
//! The engine never renders anything itself. Every message meant for the
//! user (success toasts, analytical failures, transport errors) is emitted on
//! a [`NoticeBus`] and the embedding UI decides how to show it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A single user-visible message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
    /// How long to show the notice. `None` means the UI default.
    pub duration: Option<Duration>,
    /// Whether the user can close it explicitly
    pub dismissible: bool,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            duration: None,
            dismissible: false,
            timestamp: Utc::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    /// Short-lived, dismissible error (transport failures)
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            dismissible: true,
            ..Self::new(NoticeLevel::Error, message)
        }
    }

    /// Error that stays up for `duration` and must not vanish on the short default timeout
    pub fn persistent_error(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            duration: Some(duration),
            dismissible: true,
            ..Self::new(NoticeLevel::Error, message)
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn dismissible(mut self) -> Self {
        self.dismissible = true;
        self
    }
}

/// Broadcast bus for notices
#[derive(Debug, Clone)]
pub struct NoticeBus {
    tx: broadcast::Sender<Notice>,
    capacity: usize,
}

impl NoticeBus {
    /// Creates a new bus buffering up to `capacity` notices per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future notices
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Emit a notice, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, notice: Notice) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "Notice emitted");
        let _ = self.tx.send(notice);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = NoticeBus::new(10);
        bus.emit_lossy(Notice::info("nobody listening"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_notice() {
        let bus = NoticeBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit_lossy(Notice::persistent_error("Singular matrix", Duration::from_secs(10)));

        let notice = rx.recv().await.unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Singular matrix");
        assert_eq!(notice.duration, Some(Duration::from_secs(10)));
        assert!(notice.dismissible);
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let json = serde_json::to_string(&NoticeLevel::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
