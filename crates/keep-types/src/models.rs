use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::lifecycle::NoteState;

/// Note ids are assigned by SQLite and grow monotonically.
pub type NoteId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// The authenticated caller. Produced by the Authenticator, consumed read-only.
/// Role only gates account management, never note ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub owner_id: Uuid,
    pub title: String,
    pub content: String,
    pub color: String,
    pub state: NoteState,
    pub reminder_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// A reminder is set and the note is not in the trash.
    /// Trashed notes keep `reminder_at` so that restoring re-arms it.
    pub fn is_reminder_eligible(&self) -> bool {
        self.reminder_at.is_some() && self.state != NoteState::Trashed
    }

    pub fn is_reminder_due(&self, now: DateTime<Utc>) -> bool {
        self.is_reminder_eligible() && self.reminder_at.is_some_and(|at| at <= now)
    }
}
