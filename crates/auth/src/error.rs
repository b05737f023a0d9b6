use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use quill_core::storage::RepositoryError;
use thiserror::Error;

/// Auth errors for the quill_auth crate.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("user no longer exists")]
    UserNotFound,

    #[error("failed to issue token: {0}")]
    TokenCreation(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::InvalidToken(_)
            | AuthError::InvalidCredentials
            | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::TokenCreation(_) | AuthError::Hashing(_) | AuthError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Auth error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
