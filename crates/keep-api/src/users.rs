use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use keep_types::api::{ChangePasswordRequest, CreateUserRequest, CreateUserResponse};
use keep_types::models::{Principal, Role};

use crate::auth::{AppState, blocking, hash_password};
use crate::error::ApiError;
use crate::middleware::require_admin;

const MIN_PASSWORD_LEN: usize = 6;

/// GET /users (admin)
pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&principal)?;
    let users = blocking(&state, |db| db.list_users()).await?;
    Ok(Json(users))
}

/// POST /users (admin)
pub async fn create_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&principal)?;

    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::Validation(
            "username must be 3 to 32 characters".into(),
        ));
    }
    validate_password(&req.password)?;

    let hash = hash_password(&req.password)?;
    let id = Uuid::new_v4();
    let role = req.role.unwrap_or(Role::User);
    let username = req.username.clone();
    blocking(&state, move |db| db.create_user(id, &username, &hash, role)).await?;

    info!("User {} ({}) created by {}", req.username, id, principal.id);
    Ok((StatusCode::CREATED, Json(CreateUserResponse { id })))
}

/// DELETE /users/{id} (admin). The user's notes go with it.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&principal)?;
    blocking(&state, move |db| db.delete_user(id)).await?;

    info!("User {} deleted by {}", id, principal.id);
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /users/{id}/password. Admins may change anyone's, users their own.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !principal.is_admin() && principal.id != id {
        return Err(ApiError::Forbidden);
    }
    validate_password(&req.password)?;

    let hash = hash_password(&req.password)?;
    blocking(&state, move |db| db.update_password(id, &hash)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}
