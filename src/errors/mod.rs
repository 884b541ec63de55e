// Error types shared by the API handlers, the key-value layer and the client.
use std::fmt::Display;
use thiserror::Error;

pub mod client;
pub mod response;
pub mod store;

pub use client::{ClientError, ClientResult};
pub use store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Auth(String),

    // Only the generic message reaches the caller; the cause is logged.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn auth(message: impl Into<String>) -> Self {
        AppError::Auth(message.into())
    }

    /// Builds a `map_err` adapter that logs `err` and hides it behind `message`.
    pub fn internal<E: Display>(message: &'static str) -> impl FnOnce(E) -> AppError {
        move |err| {
            tracing::error!("{}: {}", message, err);
            AppError::Internal(message.to_string())
        }
    }
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
