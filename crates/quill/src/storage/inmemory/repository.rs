//! In-memory repository implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::blog::{Post, User};
use quill_core::storage::{
    Page, Pagination, PostFilter, PostRepository, RepositoryError, Result, UserRepository,
};

/// In-memory storage backend.
///
/// Uses HashMaps wrapped in `Arc<RwLock<_>>` for thread-safe access.
/// Data is lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    posts: Arc<RwLock<HashMap<Uuid, Post>>>,
}

impl InMemoryRepository {
    /// Creates a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

fn user_exists(id: impl ToString) -> RepositoryError {
    RepositoryError::AlreadyExists {
        entity_type: "User",
        id: id.to_string(),
    }
}

/// Checks email and username uniqueness against every user except `skip`.
fn check_unique(users: &HashMap<Uuid, User>, candidate: &User) -> Result<()> {
    for existing in users.values().filter(|u| u.id != candidate.id) {
        if existing.email.eq_ignore_ascii_case(&candidate.email) {
            return Err(user_exists(&candidate.email));
        }
        if existing.username.eq_ignore_ascii_case(&candidate.username) {
            return Err(user_exists(&candidate.username));
        }
    }
    Ok(())
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(user_exists(user.id));
        }
        check_unique(&users, user)?;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(RepositoryError::user_not_found(user.id));
        }
        check_unique(&users, user)?;
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        let mut users = self.users.write().await;
        if users.remove(&id).is_none() {
            return Err(RepositoryError::user_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryRepository {
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        let posts = self.posts.read().await;
        Ok(posts.get(&id).cloned())
    }

    async fn list_posts(&self, filter: &PostFilter, pagination: Pagination) -> Result<Page<Post>> {
        let posts = self.posts.read().await;
        let mut matching: Vec<Post> = posts.values().filter(|p| filter.matches(p)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(Page::from_vec(matching, pagination))
    }

    async fn create_post(&self, post: &Post) -> Result<()> {
        let mut posts = self.posts.write().await;
        if posts.contains_key(&post.id) {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Post",
                id: post.id.to_string(),
            });
        }
        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> Result<()> {
        let mut posts = self.posts.write().await;
        if !posts.contains_key(&post.id) {
            return Err(RepositoryError::post_not_found(post.id));
        }
        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        let mut posts = self.posts.write().await;
        if posts.remove(&id).is_none() {
            return Err(RepositoryError::post_not_found(id));
        }
        Ok(())
    }

    async fn delete_posts_by_author(&self, author_id: Uuid) -> Result<u64> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|_, p| p.author_id != author_id);
        Ok((before - posts.len()) as u64)
    }
}
