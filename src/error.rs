use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::client_ip::ClientIpError;

/// Application-wide error types with appropriate HTTP status codes.
///
/// Client IP resolution itself never fails; these cover the HTTP shell around it.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request method: {0}")]
    InvalidMethod(Method),

    #[error("Invalid client IP: {0}")]
    InvalidClientIp(#[from] ClientIpError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Error response body for API endpoints.
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            // Plain text, not the JSON error body
            AppError::InvalidMethod(method) => {
                tracing::warn!(method = %method, "Invalid request method");
                return (
                    StatusCode::BAD_REQUEST,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    "Invalid request method\n",
                )
                    .into_response();
            }

            // Client errors - the offending value is the caller's own input
            AppError::InvalidClientIp(_) => {
                tracing::warn!(error = %self, "Rejecting request with unparseable client IP");
                (
                    StatusCode::BAD_REQUEST,
                    "invalid_client_ip",
                    "Unable to determine a valid client IP address.",
                )
            }

            // Internal errors - never expose internal details to clients
            AppError::SerializationError(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred.",
                )
            }
            AppError::ConfigError(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "config_error",
                    "Service configuration error.",
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: message.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
