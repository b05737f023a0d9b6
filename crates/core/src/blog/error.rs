use thiserror::Error;

/// Errors produced when validating blog requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username must be between 3 and 32 characters")]
    InvalidUsername,
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Password must be at least 8 characters")]
    PasswordTooShort,
    #[error("Post title cannot be empty")]
    EmptyTitle,
    #[error("Post title too long (max 200 characters)")]
    TitleTooLong,
    #[error("Post body cannot be empty")]
    EmptyBody,
    #[error("Too many tags (max 10)")]
    TooManyTags,
    #[error("Tag too long (max 30 characters): {0}")]
    TagTooLong(String),
    #[error("Bio too long (max 500 characters)")]
    BioTooLong,
    #[error("Page size must be between 1 and 100")]
    InvalidPageSize,
    #[error("Page number must be at least 1")]
    InvalidPage,
}
