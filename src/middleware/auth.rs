use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Owner of the bearer token, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

pub async fn require_token(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let TypedHeader(Authorization(bearer)) =
        bearer.ok_or_else(|| AppError::auth("Unauthorized"))?;

    let username = state
        .store
        .username_for_token(bearer.token())
        .await
        .map_err(AppError::internal("Token lookup failed"))?
        .ok_or_else(|| AppError::auth("Token is invalid or expired"))?;

    tracing::debug!("Authenticated request for user: {}", username);
    req.extensions_mut().insert(AuthUser { username });
    Ok(next.run(req).await)
}
