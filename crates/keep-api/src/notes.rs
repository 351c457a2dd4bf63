use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use keep_db::{NewNote, NoteUpdate};
use keep_types::api::{CreateNoteRequest, ListNotesQuery, UpdateNoteRequest};
use keep_types::lifecycle::ListFilter;
use keep_types::models::{NoteId, Principal};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;

/// POST /notes
pub async fn create_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewNote {
        title: req.title,
        content: req.content,
        color: req.color,
        reminder_at: req.reminder_at,
    };
    let note = blocking(&state, move |db| db.create_note(&principal, new)).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// GET /notes?filter=default|archived|trash|reminders
pub async fn list_notes(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListNotesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query
        .filter
        .as_deref()
        .map(ListFilter::parse)
        .unwrap_or_default();
    let notes = blocking(&state, move |db| db.list_notes(&principal, filter, Utc::now())).await?;
    Ok(Json(notes))
}

/// GET /notes/{id}
pub async fn get_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<NoteId>,
) -> Result<impl IntoResponse, ApiError> {
    let note = blocking(&state, move |db| db.get_note(&principal, id)).await?;
    Ok(Json(note))
}

/// PUT /notes/{id}
pub async fn update_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<NoteId>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = NoteUpdate {
        title: req.title,
        content: req.content,
        color: req.color,
        reminder_at: req.reminder_at,
    };
    let note = blocking(&state, move |db| db.update_note(&principal, id, update)).await?;
    Ok(Json(note))
}

/// POST /notes/{id}/archive
pub async fn archive_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<NoteId>,
) -> Result<impl IntoResponse, ApiError> {
    let note = blocking(&state, move |db| db.archive_note(&principal, id)).await?;
    Ok(Json(note))
}

/// POST /notes/{id}/unarchive
pub async fn unarchive_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<NoteId>,
) -> Result<impl IntoResponse, ApiError> {
    let note = blocking(&state, move |db| db.unarchive_note(&principal, id)).await?;
    Ok(Json(note))
}

/// POST /notes/{id}/trash
pub async fn trash_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<NoteId>,
) -> Result<impl IntoResponse, ApiError> {
    let note = blocking(&state, move |db| db.trash_note(&principal, id)).await?;
    Ok(Json(note))
}

/// POST /notes/{id}/restore
pub async fn restore_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<NoteId>,
) -> Result<impl IntoResponse, ApiError> {
    let note = blocking(&state, move |db| db.restore_note(&principal, id)).await?;
    Ok(Json(note))
}

/// DELETE /notes/{id}. Only for notes already in the trash.
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<NoteId>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |db| db.hard_delete_note(&principal, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
