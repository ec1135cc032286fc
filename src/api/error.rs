use crate::utils::error::{ErrorCategory, ErrorSeverity, TriageError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Boundary wrapper that turns a `TriageError` into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub TriageError);

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.category() {
            ErrorCategory::Input => StatusCode::BAD_REQUEST,
            ErrorCategory::Model => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCategory::Persistence
            | ErrorCategory::Configuration
            | ErrorCategory::System => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self.0.severity() {
            ErrorSeverity::Low => tracing::debug!("Rejected request: {}", self.0),
            ErrorSeverity::Medium => tracing::warn!("Request failed: {}", self.0),
            ErrorSeverity::High | ErrorSeverity::Critical => {
                tracing::error!("Request failed: {}", self.0)
            }
        }

        let body = json!({
            "error": self.0.category().as_str(),
            "message": self.0.user_friendly_message(),
        });
        (status, Json(body)).into_response()
    }
}
