//! Status codes for storage and validation failures.

use super::RepositoryError;
use crate::blog::ValidationError;

/// Missing rows are 404, uniqueness clashes 409, anything else 500.
///
/// ```
/// use quill_core::storage::{RepositoryError, repository_error_to_status_code};
///
/// let error = RepositoryError::post_not_found("abc-123");
/// assert_eq!(repository_error_to_status_code(&error), 404);
/// ```
pub fn repository_error_to_status_code(error: &RepositoryError) -> u16 {
    match error {
        RepositoryError::NotFound { .. } => 404,
        RepositoryError::AlreadyExists { .. } => 409,
        RepositoryError::QueryFailed(_) => 500,
    }
}

/// Every validation failure is a client error.
pub fn validation_error_to_status_code(_error: &ValidationError) -> u16 {
    400
}
