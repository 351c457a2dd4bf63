//! Owner-scoped note storage.
//!
//! Every read runs the access guard on the fetched row; every mutation is a
//! single conditional statement on `id`, `owner_id` and, for lifecycle moves,
//! the expected prior `state`. A statement that touches zero rows lost a race
//! and is reported as `NotFound` or `InvalidTransition`, never as success.

use chrono::{DateTime, Utc};
use keep_types::access::authorize;
use keep_types::lifecycle::{InvalidTransition, ListFilter, Transition};
use keep_types::models::{Note, NoteId, Principal};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::debug;

use crate::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{NOTE_COLUMNS, NoteRow, to_millis};

pub const DEFAULT_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub content: String,
    /// Falls back to `DEFAULT_COLOR`.
    pub color: Option<String>,
    pub reminder_at: Option<DateTime<Utc>>,
}

/// Partial edit. `None` keeps the stored value. For `reminder_at`,
/// `Some(None)` clears the reminder and `Some(Some(t))` sets it.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub reminder_at: Option<Option<DateTime<Utc>>>,
}

impl Database {
    pub fn create_note(&self, principal: &Principal, new: NewNote) -> StoreResult<Note> {
        if new.title.trim().is_empty() && new.content.trim().is_empty() {
            return Err(StoreError::Validation(
                "a note needs a title or content".into(),
            ));
        }
        let color = new.color.unwrap_or_else(|| DEFAULT_COLOR.to_string());
        validate_color(&color)?;

        let note = self.with_conn_mut(|conn| {
            let sql = format!(
                "INSERT INTO notes (owner_id, title, content, color, state, reminder_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'active', ?5, ?6)
                 RETURNING {NOTE_COLUMNS}"
            );
            let row = conn.query_row(
                &sql,
                params![
                    principal.id.to_string(),
                    new.title,
                    new.content,
                    color,
                    new.reminder_at.map(to_millis),
                    to_millis(Utc::now()),
                ],
                NoteRow::from_row,
            );
            match row {
                Ok(row) => Note::try_from(row),
                // Owner account deleted after the token was issued
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::NotFound)
                }
                Err(e) => Err(e.into()),
            }
        })?;

        debug!("Note {} created by {}", note.id, principal.id);
        Ok(note)
    }

    pub fn get_note(&self, principal: &Principal, id: NoteId) -> StoreResult<Note> {
        self.with_conn(|conn| load_owned(conn, principal, id))
    }

    /// Notes of `principal` matching `filter`, soonest reminder first
    /// (notes without one last), then newest first.
    pub fn list_notes(
        &self,
        principal: &Principal,
        filter: ListFilter,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Note>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 WHERE owner_id = ?1 AND {}
                 ORDER BY reminder_at IS NULL, reminder_at ASC, id DESC",
                filter_clause(filter)
            );
            let mut stmt = conn.prepare(&sql)?;
            let owner = principal.id.to_string();

            let rows = match filter {
                ListFilter::Reminders => stmt
                    .query_map(params![owner, to_millis(now)], NoteRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?,
                _ => stmt
                    .query_map(params![owner], NoteRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?,
            };

            rows.into_iter().map(Note::try_from).collect()
        })
    }

    /// Edits are allowed in every state; only lifecycle moves are gated.
    pub fn update_note(
        &self,
        principal: &Principal,
        id: NoteId,
        update: NoteUpdate,
    ) -> StoreResult<Note> {
        if let Some(color) = &update.color {
            validate_color(color)?;
        }

        self.with_conn_mut(|conn| {
            load_owned(conn, principal, id)?;

            let sql = format!(
                "UPDATE notes SET
                    title = COALESCE(?3, title),
                    content = COALESCE(?4, content),
                    color = COALESCE(?5, color),
                    reminder_at = CASE WHEN ?7 THEN ?6 ELSE reminder_at END
                 WHERE id = ?1 AND owner_id = ?2
                 RETURNING {NOTE_COLUMNS}"
            );
            let row = conn
                .query_row(
                    &sql,
                    params![
                        id,
                        principal.id.to_string(),
                        update.title,
                        update.content,
                        update.color,
                        update.reminder_at.flatten().map(to_millis),
                        update.reminder_at.is_some(),
                    ],
                    NoteRow::from_row,
                )
                .optional()?
                .ok_or(StoreError::NotFound)?;

            Note::try_from(row)
        })
    }

    pub fn archive_note(&self, principal: &Principal, id: NoteId) -> StoreResult<Note> {
        self.transition_note(principal, id, Transition::Archive)
    }

    pub fn unarchive_note(&self, principal: &Principal, id: NoteId) -> StoreResult<Note> {
        self.transition_note(principal, id, Transition::Unarchive)
    }

    pub fn trash_note(&self, principal: &Principal, id: NoteId) -> StoreResult<Note> {
        self.transition_note(principal, id, Transition::SoftDelete)
    }

    pub fn restore_note(&self, principal: &Principal, id: NoteId) -> StoreResult<Note> {
        self.transition_note(principal, id, Transition::Restore)
    }

    /// Permanently removes a trashed note.
    pub fn hard_delete_note(&self, principal: &Principal, id: NoteId) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let current = load_owned(conn, principal, id)?;
            Transition::HardDelete.apply(current.state)?;

            let changed = conn.execute(
                "DELETE FROM notes WHERE id = ?1 AND owner_id = ?2 AND state = ?3",
                params![id, principal.id.to_string(), current.state.as_str()],
            )?;
            if changed == 0 {
                return Err(lost_race(conn, principal, id, Transition::HardDelete));
            }

            debug!("Note {} permanently deleted by {}", id, principal.id);
            Ok(())
        })
    }

    /// All reminder-eligible notes whose reminder time has passed, across
    /// every owner. For the reminder engine only.
    pub fn due_reminders(&self, now: DateTime<Utc>) -> StoreResult<Vec<Note>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NOTE_COLUMNS} FROM notes
                 WHERE reminder_at IS NOT NULL
                   AND reminder_at <= ?1
                   AND state != 'trashed'
                 ORDER BY reminder_at ASC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![to_millis(now)], NoteRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(Note::try_from).collect()
        })
    }

    fn transition_note(
        &self,
        principal: &Principal,
        id: NoteId,
        transition: Transition,
    ) -> StoreResult<Note> {
        self.with_conn_mut(|conn| {
            let current = load_owned(conn, principal, id)?;
            let Some(target) = transition.apply(current.state)? else {
                return Err(anyhow::anyhow!("{} has no target state", transition).into());
            };

            let sql = format!(
                "UPDATE notes SET state = ?4
                 WHERE id = ?1 AND owner_id = ?2 AND state = ?3
                 RETURNING {NOTE_COLUMNS}"
            );
            let row = conn
                .query_row(
                    &sql,
                    params![
                        id,
                        principal.id.to_string(),
                        current.state.as_str(),
                        target.as_str(),
                    ],
                    NoteRow::from_row,
                )
                .optional()?;

            match row {
                Some(row) => {
                    debug!("Note {} moved {} -> {}", id, current.state, target);
                    Note::try_from(row)
                }
                None => Err(lost_race(conn, principal, id, transition)),
            }
        })
    }
}

fn validate_color(color: &str) -> StoreResult<()> {
    if color.trim().is_empty() {
        return Err(StoreError::Validation("color must not be empty".into()));
    }
    Ok(())
}

fn filter_clause(filter: ListFilter) -> &'static str {
    match filter {
        ListFilter::Default => "state = 'active'",
        ListFilter::Archived => "state = 'archived'",
        ListFilter::Trash => "state = 'trashed'",
        ListFilter::Reminders => {
            "state != 'trashed' AND reminder_at IS NOT NULL AND reminder_at > ?2"
        }
    }
}

fn query_note_by_id(conn: &Connection, id: NoteId) -> StoreResult<Option<Note>> {
    let sql = format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1");
    conn.query_row(&sql, [id], NoteRow::from_row)
        .optional()?
        .map(Note::try_from)
        .transpose()
}

/// Fetches a note and runs the access guard. A foreign note is reported
/// exactly like a missing one.
fn load_owned(conn: &Connection, principal: &Principal, id: NoteId) -> StoreResult<Note> {
    let note = query_note_by_id(conn, id)?.ok_or(StoreError::NotFound)?;
    if !authorize(principal, &note).is_allowed() {
        return Err(StoreError::NotFound);
    }
    Ok(note)
}

/// Explains why a conditional write matched zero rows.
fn lost_race(
    conn: &Connection,
    principal: &Principal,
    id: NoteId,
    transition: Transition,
) -> StoreError {
    match load_owned(conn, principal, id) {
        Ok(note) => InvalidTransition {
            transition,
            from: note.state,
        }
        .into(),
        Err(e) => e,
    }
}
