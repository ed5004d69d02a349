use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::booking::BookingError;
use crate::services::lifecycle::TransitionError;
use crate::services::verification::VerificationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    /// Identity-service failure already mapped to a user-facing message.
    #[error("{0}")]
    Auth(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("identity provider error: {0}")]
    Identity(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::Identity(_) => StatusCode::BAD_GATEWAY,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::NotAnOwner => AppError::Forbidden(message),
            BookingError::Storage(e) => AppError::Internal(e),
            _ => AppError::Validation(message),
        }
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        let message = err.to_string();
        match err {
            TransitionError::NotFound => AppError::NotFound("job".to_string()),
            TransitionError::Invalid { .. } => AppError::InvalidTransition(message),
            TransitionError::NotPermitted(_) | TransitionError::WasherNotVerified => {
                AppError::Forbidden(message)
            }
            TransitionError::Conflict => AppError::Conflict(message),
            TransitionError::Storage(e) => AppError::Internal(e),
        }
    }
}

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        let message = err.to_string();
        match err {
            VerificationError::NotFound => AppError::NotFound("user".to_string()),
            VerificationError::NotAWasher => AppError::Validation(message),
            VerificationError::Storage(e) => AppError::Internal(e),
        }
    }
}
