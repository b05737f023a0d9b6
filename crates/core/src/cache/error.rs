use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Cache operation failed: {0}")]
    OperationFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Cache is not connected")]
    NotConnected,
}

impl CacheError {
    /// Returns true if the error means the store itself is unreachable.
    ///
    /// Connection-class errors take the client out of the ready state and
    /// start a reconnect; other errors only count against the breaker.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            CacheError::ConnectionFailed(_) | CacheError::Timeout(_) | CacheError::NotConnected
        )
    }
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_display() {
        let error = CacheError::ConnectionFailed("connection refused".to_string());
        assert_eq!(error.to_string(), "Cache connection failed: connection refused");
    }

    #[test]
    fn test_timeout_display() {
        let error = CacheError::Timeout(Duration::from_millis(250));
        assert_eq!(error.to_string(), "Cache operation timed out after 250ms");
    }

    #[test]
    fn test_not_connected_display() {
        assert_eq!(CacheError::NotConnected.to_string(), "Cache is not connected");
    }

    #[test]
    fn test_connection_class() {
        assert!(CacheError::ConnectionFailed("x".into()).is_connection_error());
        assert!(CacheError::Timeout(Duration::from_secs(1)).is_connection_error());
        assert!(CacheError::NotConnected.is_connection_error());
        assert!(!CacheError::OperationFailed("WRONGTYPE".into()).is_connection_error());
        assert!(!CacheError::Serialization("eof".into()).is_connection_error());
    }
}
