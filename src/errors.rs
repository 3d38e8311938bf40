// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for the media service

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Errors that can reach a caller of the media service
/// Per-provider failures never show up here; they are recovered inside the waterfall
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("No image available for {0}")]
    NoImageAvailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Unauthorized access")]
    Unauthorized,

    #[error("Internal server error")]
    #[allow(dead_code)]
    InternalError,
}

impl MediaError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            MediaError::NoImageAvailable(_) => (StatusCode::NOT_FOUND, "NO_IMAGE_AVAILABLE"),
            MediaError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            MediaError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            MediaError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            MediaError::StorageError(_) => (StatusCode::BAD_GATEWAY, "STORAGE_ERROR"),
            MediaError::UploadFailed(_) => (StatusCode::BAD_GATEWAY, "UPLOAD_FAILED"),
            MediaError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            MediaError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Convert MediaError to HTTP response
/// DOCUMENTATION: Maps error types to HTTP status codes and JSON responses
/// NoImageAvailable is a 404 so the web client can fall back to a placeholder
impl ResponseError for MediaError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_code) = self.parts();

        let body = json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl From<sqlx::Error> for MediaError {
    fn from(err: sqlx::Error) -> Self {
        MediaError::DatabaseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_image_is_not_found() {
        let err = MediaError::NoImageAvailable("destination 'Eiffel Tower'".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("Eiffel Tower"));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            MediaError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(MediaError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            MediaError::UploadFailed("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
