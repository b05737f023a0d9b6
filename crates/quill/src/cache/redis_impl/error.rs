//! Redis error mapping to CacheError.

use quill_core::cache::CacheError;

/// Maps Redis errors to CacheError.
///
/// Anything that means the server is unreachable maps to
/// `ConnectionFailed` so the client starts reconnecting.
pub fn map_redis_error(err: redis::RedisError) -> CacheError {
    if err.is_connection_refusal()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_io_error()
    {
        CacheError::ConnectionFailed(err.to_string())
    } else {
        CacheError::OperationFailed(err.to_string())
    }
}
