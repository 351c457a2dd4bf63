use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::NoteId;

/// Events pushed over the notifications WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushEvent {
    /// Connection accepted
    Ready,

    /// A note reminder came due
    Reminder {
        note_id: NoteId,
        title: String,
        body: String,
        reminder_at: DateTime<Utc>,
    },
}
