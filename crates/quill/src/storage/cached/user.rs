//! Cached user repository decorator.
//!
//! Wraps a `UserRepository` with the `user:{id}` object cache.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use quill_core::blog::User;
use quill_core::storage::{Result, UserRepository};

use crate::cache::UserCache;

/// Cached user repository decorator.
///
/// Only lookups by ID go through the cache. Email and username lookups are
/// login paths and always read the repository. Cache failures are logged by
/// the cache client and never surface here.
pub struct CachedUserRepository<R>
where
    R: UserRepository,
{
    repository: Arc<R>,
    cache: UserCache,
}

impl<R> CachedUserRepository<R>
where
    R: UserRepository,
{
    pub fn new(repository: Arc<R>, cache: UserCache) -> Self {
        Self { repository, cache }
    }
}

#[async_trait]
impl<R> UserRepository for CachedUserRepository<R>
where
    R: UserRepository + 'static,
{
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        if let Some(user) = self.cache.get_user(id).await {
            tracing::trace!(user_id = %id, "Cache hit for user");
            return Ok(Some(user));
        }

        tracing::trace!(user_id = %id, "Cache miss for user");
        let user = self.repository.get_user(id).await?;

        if let Some(ref u) = user {
            self.cache.set_user(u).await;
        }

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repository.get_user_by_email(email).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.repository.get_user_by_username(username).await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.repository.list_users().await
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        self.repository.create_user(user).await?;

        // Populate immediately; the new user is about to be read back.
        self.cache.set_user(user).await;

        tracing::debug!(user_id = %user.id, username = %user.username, "User created");
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.repository.update_user(user).await?;

        // Repopulated on next read.
        self.cache.invalidate_user(user.id).await;

        tracing::debug!(user_id = %user.id, "User updated");
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.repository.delete_user(id).await?;
        self.cache.invalidate_user(id).await;

        tracing::debug!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::RwLock;

    use quill_core::cache::user_key;
    use quill_core::storage::RepositoryError;

    use super::*;
    use crate::cache::{CacheClient, CacheSettings, MemoryConnector, DEFAULT_USER_TTL_SECONDS};

    // Mock repository that counts ID lookups
    struct MockUserRepository {
        users: RwLock<HashMap<Uuid, User>>,
        get_calls: AtomicUsize,
    }

    impl MockUserRepository {
        fn new() -> Self {
            Self {
                users: RwLock::new(HashMap::new()),
                get_calls: AtomicUsize::new(0),
            }
        }

        fn get_calls(&self) -> usize {
            self.get_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.users.read().await.get(&id).cloned())
        }

        async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|u| u.username == username)
                .cloned())
        }

        async fn list_users(&self) -> Result<Vec<User>> {
            Ok(self.users.read().await.values().cloned().collect())
        }

        async fn create_user(&self, user: &User) -> Result<()> {
            self.users.write().await.insert(user.id, user.clone());
            Ok(())
        }

        async fn update_user(&self, user: &User) -> Result<()> {
            self.users.write().await.insert(user.id, user.clone());
            Ok(())
        }

        async fn delete_user(&self, id: Uuid) -> Result<()> {
            match self.users.write().await.remove(&id) {
                Some(_) => Ok(()),
                None => Err(RepositoryError::user_not_found(id)),
            }
        }
    }

    async fn setup() -> (
        CachedUserRepository<MockUserRepository>,
        Arc<MockUserRepository>,
        CacheClient,
    ) {
        let repo = Arc::new(MockUserRepository::new());
        let client = CacheClient::new(
            Arc::new(MemoryConnector::new(100)),
            CacheSettings::default(),
        );
        assert!(client.connect().await);
        let cached = CachedUserRepository::new(
            repo.clone(),
            UserCache::new(client.clone(), DEFAULT_USER_TTL_SECONDS),
        );
        (cached, repo, client)
    }

    #[tokio::test]
    async fn test_get_user_populates_cache() {
        let (cached, repo, client) = setup().await;
        let user = User::new("alice", "alice@example.com", "hash");
        repo.create_user(&user).await.unwrap();

        assert_eq!(cached.get_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(repo.get_calls(), 1);

        assert_eq!(cached.get_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(repo.get_calls(), 1, "second read should be served from cache");

        let stored: Option<User> = client.get(&user_key(user.id)).await;
        assert_eq!(stored, Some(user));
    }

    #[tokio::test]
    async fn test_missing_user_not_cached() {
        let (cached, repo, _) = setup().await;
        let id = Uuid::new_v4();

        assert!(cached.get_user(id).await.unwrap().is_none());
        assert!(cached.get_user(id).await.unwrap().is_none());
        assert_eq!(repo.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_create_populates_cache() {
        let (cached, repo, _) = setup().await;
        let user = User::new("alice", "alice@example.com", "hash");

        cached.create_user(&user).await.unwrap();
        assert_eq!(cached.get_user(user.id).await.unwrap(), Some(user));
        assert_eq!(repo.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let (cached, repo, _) = setup().await;
        let mut user = User::new("alice", "alice@example.com", "hash");
        cached.create_user(&user).await.unwrap();

        user.bio = Some("updated".to_string());
        cached.update_user(&user).await.unwrap();

        let fetched = cached.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.bio.as_deref(), Some("updated"));
        assert_eq!(repo.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let (cached, _, client) = setup().await;
        let user = User::new("alice", "alice@example.com", "hash");
        cached.create_user(&user).await.unwrap();

        cached.delete_user(user.id).await.unwrap();

        assert!(client.get::<User>(&user_key(user.id)).await.is_none());
        assert!(cached.get_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_cache() {
        let (cached, repo, client) = setup().await;
        let user = User::new("alice", "alice@example.com", "hash");
        repo.create_user(&user).await.unwrap();
        cached.get_user(user.id).await.unwrap();

        repo.delete_user(user.id).await.unwrap();
        // Repository no longer has it, so the decorator's delete fails and
        // leaves the (now stale) entry to expire on its own.
        assert!(cached.delete_user(user.id).await.is_err());
        assert!(client.get::<User>(&user_key(user.id)).await.is_some());
    }

    #[tokio::test]
    async fn test_works_without_cache() {
        let repo = Arc::new(MockUserRepository::new());
        let cached = CachedUserRepository::new(
            repo.clone(),
            UserCache::new(CacheClient::disabled(), DEFAULT_USER_TTL_SECONDS),
        );
        let user = User::new("alice", "alice@example.com", "hash");

        cached.create_user(&user).await.unwrap();
        assert_eq!(cached.get_user(user.id).await.unwrap(), Some(user));
        assert_eq!(repo.get_calls(), 1);
    }
}
