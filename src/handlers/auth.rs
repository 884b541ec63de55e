use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use chrono::Utc;
use crate::errors::{AppError, AppResult};
use crate::models::{Credentials, LoginResponse, MessageResponse, User};
use crate::services::credentials::{generate_token, hash_password, verify_password};
use crate::state::AppState;

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=20;
const MIN_PASSWORD_LEN: usize = 6;

pub async fn handle_register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let form = read_credentials(payload)?;

    if !USERNAME_LEN.contains(&form.username.chars().count()) {
        return Err(AppError::validation("Username must be 3-20 characters"));
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation("Password must be at least 6 characters"));
    }

    let existing = state
        .store
        .get_user(&form.username)
        .await
        .map_err(AppError::internal("Registration failed"))?;
    if existing.is_some() {
        return Err(AppError::Conflict("Username already exists".into()));
    }

    let user = User {
        password_hash: hash_password(&form.password, state.config.auth.bcrypt_cost).await?,
        username: form.username,
        created_at: Utc::now(),
    };

    state
        .store
        .save_user(&user)
        .await
        .map_err(AppError::internal("Registration failed"))?;

    tracing::info!("Registered user: {}", user.username);
    Ok(Json(MessageResponse::new("Registration successful")))
}

pub async fn handle_login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let form = read_credentials(payload)?;

    let user = state
        .store
        .get_user(&form.username)
        .await
        .map_err(AppError::internal("Login failed"))?
        .ok_or_else(|| AppError::NotFound("User does not exist".into()))?;

    if !verify_password(&form.password, &user.password_hash).await? {
        return Err(AppError::auth("Incorrect password"));
    }

    let token = generate_token();
    state
        .store
        .save_token(&token, &user.username)
        .await
        .map_err(AppError::internal("Login failed"))?;

    tracing::info!("User logged in: {}", user.username);
    Ok(Json(LoginResponse {
        token,
        username: user.username,
        message: "Login successful".into(),
    }))
}

fn read_credentials(payload: Result<Json<Credentials>, JsonRejection>) -> AppResult<Credentials> {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => {
            tracing::debug!("Rejected credentials body: {}", rejection);
            return Err(AppError::validation("Invalid request body"));
        }
    };

    if form.is_incomplete() {
        return Err(AppError::validation("Username and password are required"));
    }
    Ok(form)
}
