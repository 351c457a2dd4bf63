use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};

use keep_types::models::Principal;

use crate::auth::{AppState, authenticate};
use crate::error::ApiError;

/// Validates the bearer token and stores the caller's `Principal` in the
/// request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.map_err(|_| ApiError::Unauthenticated)?;
    let principal = authenticate(&state.jwt_secret, bearer.token())?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Account management is the only place role matters.
pub fn require_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}
