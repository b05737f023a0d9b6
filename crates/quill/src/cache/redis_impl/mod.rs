//! Redis cache backend.
//!
//! Uses one multiplexed tokio connection per connect. Reconnection is
//! driven by `CacheClient`, not by the connection itself.

mod error;
mod store;

pub use store::{RedisConnector, RedisStore};
