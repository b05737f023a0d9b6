//! Per-user object cache.

use uuid::Uuid;

use quill_core::blog::User;
use quill_core::cache::user_key;

use super::CacheClient;

/// Default lifetime of a cached user: one hour.
pub const DEFAULT_USER_TTL_SECONDS: u64 = 3600;

/// Caches users under `user:{id}`.
#[derive(Clone)]
pub struct UserCache {
    client: CacheClient,
    ttl_seconds: u64,
}

impl UserCache {
    pub fn new(client: CacheClient, ttl_seconds: u64) -> Self {
        Self {
            client,
            ttl_seconds,
        }
    }

    pub async fn set_user(&self, user: &User) -> bool {
        self.client
            .set(&user_key(user.id), user, self.ttl_seconds)
            .await
    }

    pub async fn get_user(&self, id: Uuid) -> Option<User> {
        self.client.get(&user_key(id)).await
    }

    pub async fn invalidate_user(&self, id: Uuid) -> bool {
        self.client.delete(&user_key(id)).await
    }
}
