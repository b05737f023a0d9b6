//! In-memory cache backend.
//!
//! Single-process store with LRU eviction and lazy TTL expiry. Used for
//! `CACHE_BACKEND=memory` and as the backing store in tests.

mod store;

pub use store::{MemoryConnector, MemoryStore};
