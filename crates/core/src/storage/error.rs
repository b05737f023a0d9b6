use thiserror::Error;

/// Failures surfaced by a user or post repository.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    /// A uniqueness constraint rejected the write. `id` names the clashing value.
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    /// The backing store failed for a reason the caller cannot fix.
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

impl RepositoryError {
    pub fn user_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "User",
            id: id.to_string(),
        }
    }

    pub fn post_not_found(id: impl ToString) -> Self {
        Self::NotFound {
            entity_type: "Post",
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
