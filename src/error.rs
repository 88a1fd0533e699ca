//! Error types for modelscout
//!
//! All errors implement `IntoResponse` for Axum handlers. Errors raised
//! inside a conversation turn are recovered before they reach an adapter
//! (see `ChatService::process_turn`); the HTTP mappings here cover the
//! request-validation and configuration surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Message is empty")]
    EmptyInput,

    #[error("Completion request to {endpoint} failed: {reason}")]
    Completion { endpoint: String, reason: String },

    #[error("Intent classification failed: {0}")]
    Classification(String),

    #[error("Reply generation failed: {0}")]
    Generation(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Delivery to {platform} failed: {reason}")]
    PlatformDelivery { platform: String, reason: String },

    #[error("Unauthorized sender: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::EmptyInput => (StatusCode::BAD_REQUEST, self.to_string()),
            Self::Unauthorized(_) => (StatusCode::FORBIDDEN, self.to_string()),
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Completion { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::Classification(_) | Self::Generation(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            Self::Persistence(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::PlatformDelivery { .. } => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creates() {
        let err = AppError::Config("test error".to_string());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_validation_error_creates() {
        let err = AppError::Validation("invalid input".to_string());
        assert_eq!(err.to_string(), "Invalid request: invalid input");
    }

    #[test]
    fn test_completion_error_names_endpoint() {
        let err = AppError::Completion {
            endpoint: "http://localhost:9999/v1".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("http://localhost:9999/v1"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_validation_error_response_status() {
        let err = AppError::Validation("test".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_empty_input_response_status() {
        let response = AppError::EmptyInput.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_unauthorized_response_status() {
        let err = AppError::Unauthorized("919876543210".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_completion_error_response_status() {
        let err = AppError::Completion {
            endpoint: "e".to_string(),
            reason: "r".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_persistence_error_response_status() {
        let err = AppError::Persistence("redis down".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
