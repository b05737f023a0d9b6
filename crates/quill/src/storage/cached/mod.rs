//! Cached repository decorators.
//!
//! Cache-aside on top of a repository trait:
//!
//! - **Reads**: check the cache first, on miss fetch from the repository and
//!   populate the cache
//! - **Writes**: persist to the repository, then refresh or invalidate the
//!   cached copy
//!
//! # Example
//!
//! ```ignore
//! let repo = Arc::new(InMemoryRepository::new());
//! let users = CachedUserRepository::new(repo, UserCache::new(client, 3600));
//! ```

mod user;

pub use user::CachedUserRepository;
