use async_trait::async_trait;
use uuid::Uuid;

use crate::blog::{Post, User};

use super::{Page, Pagination, PostFilter, Result};

/// Repository for user operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Gets a user by their email address (case-insensitive).
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Gets a user by their username (case-insensitive).
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Lists all users, oldest first.
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Creates a new user. Fails with `AlreadyExists` on a duplicate
    /// email or username.
    async fn create_user(&self, user: &User) -> Result<()>;

    /// Updates an existing user.
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Deletes a user by their ID.
    async fn delete_user(&self, id: Uuid) -> Result<()>;
}

/// Repository for post operations.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Gets a post by its ID.
    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;

    /// Lists posts matching the filter, newest first.
    async fn list_posts(&self, filter: &PostFilter, pagination: Pagination) -> Result<Page<Post>>;

    /// Creates a new post.
    async fn create_post(&self, post: &Post) -> Result<()>;

    /// Updates an existing post.
    async fn update_post(&self, post: &Post) -> Result<()>;

    /// Deletes a post by its ID.
    async fn delete_post(&self, id: Uuid) -> Result<()>;

    /// Deletes every post written by `author_id`, returning how many went.
    async fn delete_posts_by_author(&self, author_id: Uuid) -> Result<u64>;
}
