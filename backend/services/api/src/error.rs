use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use helpdesk_common::error::HelpdeskError;

pub struct ApiError(pub HelpdeskError);

impl From<HelpdeskError> for ApiError {
    fn from(err: HelpdeskError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            HelpdeskError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            HelpdeskError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            HelpdeskError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            HelpdeskError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            HelpdeskError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            other => {
                tracing::error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
