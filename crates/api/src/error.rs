//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use coordinator::{DeliveryError, ErrorKind};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Error returned by the delivery coordinator.
    Delivery(DeliveryError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Delivery(err) => err.kind(),
        }
    }
}

/// Status code for an error category.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::ConstraintViolation => StatusCode::CONFLICT,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        let message = match self {
            ApiError::NotFound(msg) => msg,
            ApiError::Delivery(err) => err.to_string(),
        };

        metrics::counter!("delivery_http_errors_total", "kind" => kind.as_str()).increment(1);
        if status.is_server_error() {
            tracing::error!(error = %message, %kind, "request failed");
        }

        let body = serde_json::json!({ "error": message, "kind": kind.as_str() });
        (status, axum::Json(body)).into_response()
    }
}

impl From<DeliveryError> for ApiError {
    fn from(err: DeliveryError) -> Self {
        ApiError::Delivery(err)
    }
}
