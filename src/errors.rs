use axum::response::IntoResponse;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors crossing the HTTP route boundary. Per-request pipeline failures
/// never land here; they degrade sections inside the payload instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
        }
    }
}
