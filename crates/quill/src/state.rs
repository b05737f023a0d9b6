//! Shared application state.
//!
//! Cloned for each request. Repositories are trait objects so the cached
//! decorator and the raw in-memory store are interchangeable.

use std::sync::Arc;

use quill_auth::AuthState;
use quill_core::storage::{PostRepository, UserRepository};

use crate::cache::{CacheClient, UserCache};
use crate::config::Config;
use crate::storage::{CachedUserRepository, InMemoryRepository};

#[derive(Clone)]
pub struct AppState {
    /// User repository, wrapped by the `user:{id}` cache.
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    /// Shared cache client. Clones share one connection.
    pub cache: CacheClient,
    pub auth: AuthState,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds state over a fresh in-memory store.
    pub fn new(config: Config, cache: CacheClient) -> Self {
        let repository = Arc::new(InMemoryRepository::new());
        let user_cache = UserCache::new(cache.clone(), config.user_cache_ttl_seconds);
        let users: Arc<dyn UserRepository> =
            Arc::new(CachedUserRepository::new(repository.clone(), user_cache));
        let auth = AuthState::new(users.clone(), &config.auth);

        Self {
            users,
            posts: repository,
            cache,
            auth,
            config: Arc::new(config),
        }
    }
}

impl AsRef<AuthState> for AppState {
    fn as_ref(&self) -> &AuthState {
        &self.auth
    }
}
