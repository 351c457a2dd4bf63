//! Note visibility state machine.
//!
//! A note is always in exactly one of `Active`, `Archived` or `Trashed`.
//! "Removed" is not a stored state: it is the outcome of a hard delete,
//! represented here as `None` from [`Transition::apply`].
//!
//! | From               | Transition | To       |
//! |--------------------|------------|----------|
//! | Active             | Archive    | Archived |
//! | Archived           | Unarchive  | Active   |
//! | Active, Archived   | SoftDelete | Trashed  |
//! | Trashed            | Restore    | Active   |
//! | Trashed            | HardDelete | removed  |
//!
//! Repeating an applied transition is rejected like any other illegal move.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteState {
    Active,
    Archived,
    Trashed,
}

impl NoteState {
    pub const ALL: [NoteState; 3] = [NoteState::Active, NoteState::Archived, NoteState::Trashed];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteState::Active => "active",
            NoteState::Archived => "archived",
            NoteState::Trashed => "trashed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(NoteState::Active),
            "archived" => Some(NoteState::Archived),
            "trashed" => Some(NoteState::Trashed),
            _ => None,
        }
    }
}

impl fmt::Display for NoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Archive,
    Unarchive,
    SoftDelete,
    Restore,
    HardDelete,
}

impl Transition {
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Archive => "archive",
            Transition::Unarchive => "unarchive",
            Transition::SoftDelete => "soft delete",
            Transition::Restore => "restore",
            Transition::HardDelete => "hard delete",
        }
    }

    /// States this transition may start from.
    pub fn source_states(&self) -> &'static [NoteState] {
        match self {
            Transition::Archive => &[NoteState::Active],
            Transition::Unarchive => &[NoteState::Archived],
            Transition::SoftDelete => &[NoteState::Active, NoteState::Archived],
            Transition::Restore | Transition::HardDelete => &[NoteState::Trashed],
        }
    }

    /// Target state, or `None` when the note ceases to exist.
    pub fn target(&self) -> Option<NoteState> {
        match self {
            Transition::Archive => Some(NoteState::Archived),
            Transition::Unarchive | Transition::Restore => Some(NoteState::Active),
            Transition::SoftDelete => Some(NoteState::Trashed),
            Transition::HardDelete => None,
        }
    }

    pub fn is_legal_from(&self, from: NoteState) -> bool {
        self.source_states().contains(&from)
    }

    pub fn apply(&self, from: NoteState) -> Result<Option<NoteState>, InvalidTransition> {
        if self.is_legal_from(from) {
            Ok(self.target())
        } else {
            Err(InvalidTransition {
                transition: *self,
                from,
            })
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {transition} a note that is {from}")]
pub struct InvalidTransition {
    pub transition: Transition,
    pub from: NoteState,
}

/// Listing views. Unrecognized names fall back to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListFilter {
    #[default]
    Default,
    Archived,
    Trash,
    Reminders,
}

impl ListFilter {
    pub fn parse(s: &str) -> Self {
        match s {
            "archived" => ListFilter::Archived,
            "trash" => ListFilter::Trash,
            "reminders" => ListFilter::Reminders,
            _ => ListFilter::Default,
        }
    }

    pub fn matches(&self, note: &Note, now: DateTime<Utc>) -> bool {
        match self {
            ListFilter::Default => note.state == NoteState::Active,
            ListFilter::Archived => note.state == NoteState::Archived,
            ListFilter::Trash => note.state == NoteState::Trashed,
            ListFilter::Reminders => {
                note.state != NoteState::Trashed && note.reminder_at.is_some_and(|at| at > now)
            }
        }
    }
}
