use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keep_types::models::{Note, NoteId};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

const FALLBACK_TITLE: &str = "Reminder";
const FALLBACK_BODY: &str = "You have a reminder";
const MAX_BODY_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("no live connection for user {0}")]
    NoRecipient(Uuid),

    #[error("sink failed: {0}")]
    Sink(String),
}

/// One reminder occurrence, ready to hand to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: Uuid,
    pub note_id: NoteId,
    pub title: String,
    pub body: String,
    pub reminder_at: DateTime<Utc>,
}

impl Notification {
    /// `None` when the note has no reminder.
    pub fn for_note(note: &Note) -> Option<Self> {
        let reminder_at = note.reminder_at?;

        let title = if note.title.trim().is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            note.title.clone()
        };
        let body = if note.content.trim().is_empty() {
            FALLBACK_BODY.to_string()
        } else {
            note.content.chars().take(MAX_BODY_CHARS).collect()
        };

        Some(Self {
            recipient: note.owner_id,
            note_id: note.id,
            title,
            body,
            reminder_at,
        })
    }
}

/// Where due reminders go. Implementations are picked at construction;
/// the engine never branches on the concrete type.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// `Ok` means the notification was accepted for delivery.
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Writes reminders to the log. Always succeeds.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, n: &Notification) -> Result<(), DeliveryError> {
        info!(
            recipient = %n.recipient,
            note_id = n.note_id,
            "Reminder: {} - {}",
            n.title,
            n.body
        );
        Ok(())
    }
}
