//! Cache key and invalidation pattern builders.
//!
//! Read-through keys are `"{METHOD}:{path_and_query}"` computed from the
//! original request URI, so the invalidation patterns below are written
//! against the full `/api/...` paths.

use uuid::Uuid;

/// Returns the cache key for a user object.
pub fn user_key(user_id: Uuid) -> String {
    format!("user:{}", user_id)
}

/// Returns the read-through key for a request.
///
/// Distinct query strings produce distinct keys.
pub fn request_key(method: &str, path_and_query: &str) -> String {
    format!("{}:{}", method, path_and_query)
}

/// Pattern matching every cached post read (lists and details).
pub fn posts_pattern() -> String {
    "GET:/api/posts*".to_string()
}

/// Patterns matching the cached post list views only.
///
/// The bare list and every query-string variant of it; detail keys
/// (`/api/posts/{id}`) are left alone.
pub fn post_list_patterns() -> Vec<String> {
    vec!["GET:/api/posts".to_string(), "GET:/api/posts?*".to_string()]
}

/// Pattern matching the cached detail view of one post.
pub fn post_detail_pattern(post_id: Uuid) -> String {
    format!("GET:/api/posts/{}*", post_id)
}

/// Pattern matching every cached user read.
pub fn users_pattern() -> String {
    "GET:/api/users*".to_string()
}
