//! Storage backend implementations.
//!
//! Concrete implementations of the repository traits defined in
//! `quill_core::storage`, plus the cache-aside decorators layered on top.

pub mod cached;
pub mod inmemory;

pub use cached::CachedUserRepository;
pub use inmemory::InMemoryRepository;
