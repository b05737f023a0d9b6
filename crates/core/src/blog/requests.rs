//! API request payloads for users and posts.
//!
//! Pure data types; validation lives in `operations`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{Post, User};
use crate::serde::{deserialize_optional_string, deserialize_optional_uuid};

/// Request payload for registering a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request payload for logging in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request payload for updating a user profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

impl UpdateUserRequest {
    /// Apply updates to an existing user.
    pub fn apply_to(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username.trim().to_string();
        }
        if let Some(bio) = self.bio {
            user.bio = Some(bio).filter(|b| !b.trim().is_empty());
        }
        user.updated_at = Utc::now();
    }
}

/// Request payload for creating a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_published")]
    pub published: bool,
}

fn default_published() -> bool {
    true
}

impl CreatePostRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: Vec::new(),
            published: true,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Convert into a post owned by `author_id`. Tags are expected to be
    /// normalized already.
    pub fn into_post(self, author_id: Uuid) -> Post {
        Post::new(author_id, self.title.trim(), self.body)
            .with_tags(self.tags)
            .with_published(self.published)
    }
}

/// Request payload for updating a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

impl UpdatePostRequest {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Apply updates to an existing post.
    pub fn apply_to(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title.trim().to_string();
        }
        if let Some(body) = self.body {
            post.body = body;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(published) = self.published {
            post.published = published;
        }
        post.updated_at = Utc::now();
    }
}

/// Query parameters for listing posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Only posts by this author.
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub author: Option<Uuid>,
    /// Only posts carrying this tag.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub tag: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for ListPostsQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            author: None,
            tag: None,
        }
    }
}
