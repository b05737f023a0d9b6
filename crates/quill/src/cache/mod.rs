//! Cache backends and the resilient client on top of them.
//!
//! The backend is picked at runtime from `CACHE_BACKEND`:
//!
//! - `redis` (default): Redis over a multiplexed connection
//! - `memory`: in-process LRU store
//! - `disabled`: no cache at all

mod client;
pub mod memory;
pub mod redis_impl;
mod user_cache;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CacheClient, CacheSettings};
pub use memory::MemoryConnector;
pub use redis_impl::RedisConnector;
pub use user_cache::{UserCache, DEFAULT_USER_TTL_SECONDS};
