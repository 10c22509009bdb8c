use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{error, warn};

use crate::completion::CompletionError;

/// Custom error type for the application
#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    RateLimited(String),
    InternalServerError(String),
}

/// Error envelope returned to callers: a single `error` field.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::RateLimited(msg) => {
                warn!("Rate limit exhausted: {}", msg);
                (StatusCode::TOO_MANY_REQUESTS, msg)
            }
            AppError::InternalServerError(msg) => {
                error!("Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse { error: message });

        (status, body).into_response()
    }
}

impl From<CompletionError> for AppError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::RateLimited(msg) => AppError::RateLimited(msg),
            CompletionError::Fatal(msg) => AppError::InternalServerError(msg),
        }
    }
}

/// Result type for application handlers
pub type AppResult<T> = Result<T, AppError>;
