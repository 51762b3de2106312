use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::enhance::EnhancementError;
use crate::lockout::LockoutError;
use crate::store::PersistenceError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// A PIN was submitted while the lockout is still running. Expected traffic, not a fault.
    #[error("Locked for another {seconds_remaining}s")]
    StillLocked { seconds_remaining: i64 },

    #[error("Lockout error: {0}")]
    Lockout(#[from] LockoutError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Enhancement error: {0}")]
    Enhancement(#[from] EnhancementError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Admin login required".to_string(),
            ),
            AppError::StillLocked { seconds_remaining } => {
                tracing::debug!("PIN rejected, {seconds_remaining}s of lockout left");
                (
                    StatusCode::LOCKED,
                    "STILL_LOCKED",
                    format!("Too many failed attempts. Try again in {seconds_remaining}s"),
                )
            }
            AppError::Lockout(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Persistence(PersistenceError::NotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Resume {id} not found"),
            ),
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Enhancement(EnhancementError::NotConfigured) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "ENHANCEMENT_UNAVAILABLE",
                "Text enhancement is not configured".to_string(),
            ),
            AppError::Enhancement(e) => {
                tracing::error!("Enhancement error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ENHANCEMENT_ERROR",
                    "The enhancement provider failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": code,
                "message": message
            }
        });
        if let AppError::StillLocked { seconds_remaining } = &self {
            body["error"]["seconds_remaining"] = json!(seconds_remaining);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                AppError::StillLocked {
                    seconds_remaining: 30,
                },
                StatusCode::LOCKED,
            ),
            (AppError::Lockout(LockoutError::MalformedPin), StatusCode::BAD_REQUEST),
            (
                AppError::Persistence(PersistenceError::NotFound(Uuid::new_v4())),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Persistence(PersistenceError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::Enhancement(EnhancementError::NotConfigured),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
