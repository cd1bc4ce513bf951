use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use docsweep_core::error::AppError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            AppError::ConfigError(_) => (StatusCode::BAD_REQUEST, "invalid_spec"),
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::MalformedUrl { .. } => (StatusCode::BAD_REQUEST, "malformed_url"),
            AppError::IngestionError { .. } | AppError::IndexInitializationError(_) => {
                (StatusCode::BAD_GATEWAY, "search_engine_error")
            }
            AppError::NetworkError(_) | AppError::HttpError(_) => {
                (StatusCode::BAD_GATEWAY, "upstream_error")
            }
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.0.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
