use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{error, info};
use uuid::Uuid;

use keep_db::{Database, StoreError, StoreResult};
use keep_reminders::push::PushHub;
use keep_types::api::{Claims, LoginRequest, LoginResponse};
use keep_types::models::{Principal, Role, User};

use crate::error::ApiError;

/// Tokens expire after a day.
const TOKEN_TTL_HOURS: i64 = 24;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub push: PushHub,
}

/// Runs a store call off the async runtime.
pub async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&*db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let row = blocking(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthenticated)?;

    if !verify_password(&req.password, &row.password)? {
        return Err(ApiError::Unauthenticated);
    }

    let user = User::try_from(row)?;
    let token = create_token(&state.jwt_secret, &user).map_err(|e| {
        error!("Token encoding failed: {}", e);
        ApiError::Internal
    })?;

    info!("{} ({}) logged in", user.username, user.id);
    Ok(Json(LoginResponse { token, user }))
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            ApiError::Internal
        })
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Corrupt password hash: {}", e);
        ApiError::Internal
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validates a bearer token and turns its claims into the caller's principal.
pub fn authenticate(secret: &str, token: &str) -> Result<Principal, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated)?;

    Ok(Principal::new(data.claims.sub, data.claims.role))
}

/// Creates the `admin` account if it does not exist yet.
/// Returns true when an account was created.
pub fn seed_admin(db: &Database, password: &str) -> anyhow::Result<bool> {
    if db.get_user_by_username("admin")?.is_some() {
        return Ok(false);
    }

    let hash = hash_password(password).map_err(|e| anyhow::anyhow!("{}", e))?;
    match db.create_user(Uuid::new_v4(), "admin", &hash, Role::Admin) {
        Ok(()) => Ok(true),
        Err(StoreError::Conflict(_)) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
