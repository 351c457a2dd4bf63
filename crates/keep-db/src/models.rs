//! Database row types. These map directly to SQLite rows and are converted
//! into the `keep-types` models at the crate boundary.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use keep_types::models::{Note, NoteState, Role, User};
use rusqlite::Row;
use uuid::Uuid;

use crate::error::StoreError;

pub(crate) const NOTE_COLUMNS: &str =
    "id, owner_id, title, content, color, state, reminder_at, created_at";

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: i64,
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            role: Role::parse(&row.role)
                .ok_or_else(|| anyhow!("Corrupt role '{}' on user '{}'", row.role, row.id))?,
            created_at: from_millis(row.created_at)?,
            username: row.username,
        })
    }
}

pub struct NoteRow {
    pub id: i64,
    pub owner_id: String,
    pub title: String,
    pub content: String,
    pub color: String,
    pub state: String,
    pub reminder_at: Option<i64>,
    pub created_at: i64,
}

impl NoteRow {
    /// Expects columns in `NOTE_COLUMNS` order.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            content: row.get(3)?,
            color: row.get(4)?,
            state: row.get(5)?,
            reminder_at: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl TryFrom<NoteRow> for Note {
    type Error = StoreError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        Ok(Note {
            id: row.id,
            owner_id: parse_uuid(&row.owner_id)?,
            state: NoteState::parse(&row.state)
                .ok_or_else(|| anyhow!("Corrupt state '{}' on note {}", row.state, row.id))?,
            reminder_at: row.reminder_at.map(from_millis).transpose()?,
            created_at: from_millis(row.created_at)?,
            title: row.title,
            content: row.content,
            color: row.color,
        })
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| anyhow!("Timestamp out of range: {}", ms).into())
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    s.parse::<Uuid>()
        .map_err(|e| anyhow!("Corrupt id '{}': {}", s, e).into())
}
