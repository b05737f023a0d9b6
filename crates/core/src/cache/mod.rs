mod backoff;
mod breaker;
mod error;
mod keys;
mod patterns;
mod serialization;
mod state;
mod traits;

pub use backoff::ReconnectPolicy;
pub use breaker::{BreakerSnapshot, BreakerTransition, CircuitBreaker};
pub use error::{CacheError, Result};
pub use keys::{
    post_detail_pattern, post_list_patterns, posts_pattern, request_key, user_key, users_pattern,
};
pub use patterns::{pattern_matches, to_redis_glob};
pub use serialization::{decode, encode, SerializationError};
pub use state::{CacheStatus, ConnectionState};
pub use traits::{CacheConnector, CacheStore};
