use axum::http::StatusCode;
use axum::response::{ IntoResponse, Response };
use axum::Json;
use log::error;
use thiserror::Error;

/// Request-level failures surfaced to the HTTP caller.
///
/// Soft upstream failures (degraded advice/chat content) never take this
/// path; they are converted into well-shaped payloads before the HTTP
/// layer sees them.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing fields in the inbound payload.
    #[error("{0}")]
    InvalidRequest(String),

    /// A required backend handle failed to initialize at startup.
    /// Permanent until process restart.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The scoring call (or another required upstream call) failed
    /// mid-request.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("Request failed ({:?}): {}", self.status_code(), self);
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status_code(), Json(body)).into_response()
    }
}
