//! In-memory storage backend.
//!
//! Stores all data in HashMaps wrapped in `Arc<RwLock<_>>`. Nothing is
//! persisted; this is the backend the server runs with and the one tests
//! use.
//!
//! # Example
//!
//! ```rust,ignore
//! use quill::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! ```

mod repository;

pub use repository::InMemoryRepository;
