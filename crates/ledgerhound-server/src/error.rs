use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use ledgerhound_core::error::AppError;

use crate::dto::ErrorResponse;

/// Route-level error, convertible from [`AppError`] so handlers can use `?`.
pub enum ApiError {
    NotFound(String),
    App(AppError),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::App(err) => {
                let (status, error_type) = match &err {
                    AppError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
                    AppError::SerializationError(_) => {
                        (StatusCode::BAD_REQUEST, "serialization_error")
                    }
                    AppError::DatabaseError(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                    }
                    AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
                    AppError::RateLimitExceeded => {
                        (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded")
                    }
                    AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                    _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
                };
                (status, error_type, err.to_string())
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}
