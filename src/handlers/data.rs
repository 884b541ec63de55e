use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde_json::Value;
use crate::errors::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::models::{DataResponse, MessageResponse};
use crate::state::AppState;

pub async fn get_data(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<DataResponse<Value>>> {
    let data = state
        .store
        .get_data(&user.username)
        .await
        .map_err(AppError::internal("Failed to fetch data"))?;

    Ok(Json(DataResponse { data }))
}

/// Overwrites the stored dataset; the last writer wins.
pub async fn save_data(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let data = match payload {
        Ok(Json(data)) if data.is_object() => data,
        Ok(_) => return Err(AppError::validation("Invalid data format")),
        Err(rejection) => {
            tracing::debug!("Rejected data body: {}", rejection);
            return Err(AppError::validation("Invalid data format"));
        }
    };

    state
        .store
        .save_data(&user.username, &data)
        .await
        .map_err(AppError::internal("Failed to save data"))?;

    tracing::debug!("Saved dataset for user: {}", user.username);
    Ok(Json(MessageResponse::new("Data saved")))
}

pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}
