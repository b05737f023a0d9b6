use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use quill_auth::AuthError;
use quill_core::blog::ValidationError;
use quill_core::storage::{
    repository_error_to_status_code, validation_error_to_status_code, RepositoryError,
};

/// The caller is authenticated but may not touch this resource.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Forbidden(pub &'static str);

pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_code(&self) -> StatusCode {
        let code = if let Some(e) = self.0.downcast_ref::<RepositoryError>() {
            repository_error_to_status_code(e)
        } else if let Some(e) = self.0.downcast_ref::<ValidationError>() {
            validation_error_to_status_code(e)
        } else if let Some(e) = self.0.downcast_ref::<AuthError>() {
            return e.status_code();
        } else if self.0.downcast_ref::<Forbidden>().is_some() {
            403
        } else {
            500
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self.0, "Application error");
            "Internal server error".to_string()
        } else {
            tracing::debug!(status = %status, error = %self.0, "Request rejected");
            self.0.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
