use std::time::Duration;

use axum::{
    handler::Handler,
    http::{header, Method, StatusCode},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use quill_core::cache::{post_detail_pattern, post_list_patterns, posts_pattern, users_pattern};

use crate::{
    handlers::{
        auth::{login, me, register},
        health::{livez, readyz},
        posts::{create_post, delete_post, get_post, list_posts, update_post},
        users::{delete_user, get_user, list_users, update_user},
    },
    middleware::{
        invalidate, read_through, InvalidateCache, PatternSource, ReadThroughCache, RequestInfo,
        ResponseInfo,
    },
    state::AppState,
};

/// List views plus the detail view of the post named in the path.
fn post_patterns(request: &RequestInfo, _response: &ResponseInfo) -> Vec<String> {
    match request.param("id").and_then(|id| Uuid::parse_str(id).ok()) {
        Some(id) => {
            let mut patterns = post_list_patterns();
            patterns.push(post_detail_pattern(id));
            patterns
        }
        None => vec![posts_pattern()],
    }
}

/// Create the application router with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let client = state.cache.clone();
    let cached = ReadThroughCache::new(client.clone()).with_ttl(state.config.cache_ttl_seconds);
    let cached = from_fn_with_state(cached, read_through);

    let users_changed = from_fn_with_state(
        InvalidateCache::new(client.clone(), users_pattern()),
        invalidate,
    );
    let user_removed = from_fn_with_state(
        InvalidateCache::new(client.clone(), vec![users_pattern(), posts_pattern()]),
        invalidate,
    );
    let post_created = from_fn_with_state(
        InvalidateCache::new(client.clone(), posts_pattern()),
        invalidate,
    );
    let post_changed = from_fn_with_state(
        InvalidateCache::new(client, PatternSource::dynamic(post_patterns)),
        invalidate,
    );

    // CORS configuration for API endpoints
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let api_routes = Router::new()
        // Auth routes
        .route("/auth/register", post(register.layer(users_changed.clone())))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        // User routes
        .route("/users", get(list_users.layer(cached.clone())))
        .route(
            "/users/{id}",
            get(get_user.layer(cached.clone()))
                .put(update_user.layer(users_changed))
                .delete(delete_user.layer(user_removed)),
        )
        // Post routes
        .route(
            "/posts",
            get(list_posts.layer(cached.clone())).post(create_post.layer(post_created)),
        )
        .route(
            "/posts/{id}",
            get(get_post.layer(cached))
                .put(update_post.layer(post_changed.clone()))
                .delete(delete_post.layer(post_changed)),
        )
        .layer(cors);

    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, Response},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::testing::ScriptedConnector;
    use crate::cache::{CacheClient, CacheSettings, MemoryConnector};
    use crate::config::Config;

    async fn memory_state() -> AppState {
        let client = CacheClient::new(
            Arc::new(MemoryConnector::new(1000)),
            CacheSettings::default(),
        );
        assert!(client.connect().await);
        AppState::new(Config::default(), client)
    }

    struct TestApp {
        app: Router,
        cache: CacheClient,
    }

    impl TestApp {
        fn new(state: AppState) -> Self {
            let cache = state.cache.clone();
            Self {
                app: create_app(state),
                cache,
            }
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> Response<Body> {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            let response = self
                .app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            // Let background cache writes and invalidations land.
            self.cache.flush_pending().await;
            response
        }

        async fn get(&self, uri: &str) -> Response<Body> {
            self.send(Method::GET, uri, None, None).await
        }

        /// Registers a user and returns (token, user id).
        async fn register(&self, username: &str) -> (String, String) {
            let response = self
                .send(
                    Method::POST,
                    "/api/auth/register",
                    None,
                    Some(json!({
                        "username": username,
                        "email": format!("{username}@example.com"),
                        "password": "correct horse battery",
                    })),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            let body = json_body(response).await;
            (
                body["token"].as_str().unwrap().to_string(),
                body["user"]["id"].as_str().unwrap().to_string(),
            )
        }

        async fn create_post(&self, token: &str, title: &str) -> String {
            let response = self
                .send(
                    Method::POST,
                    "/api/posts",
                    Some(token),
                    Some(json!({ "title": title, "body": "Some text", "tags": ["Rust"] })),
                )
                .await;
            assert_eq!(response.status(), StatusCode::CREATED);
            json_body(response).await["id"].as_str().unwrap().to_string()
        }
    }

    fn x_cache(response: &Response<Body>) -> Option<&str> {
        response
            .headers()
            .get("x-cache")
            .and_then(|v| v.to_str().ok())
    }

    async fn json_body(response: Response<Body>) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    // ==================== Health ====================

    #[tokio::test]
    async fn test_livez() {
        let app = TestApp::new(memory_state().await);
        let response = app.get("/livez").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_reports_cache() {
        let app = TestApp::new(memory_state().await);
        let response = app.get("/readyz").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cache"]["ready"], true);
        assert_eq!(body["cache"]["state"], "ready");
        assert_eq!(body["cache"]["breaker"]["is_open"], false);
        assert_eq!(body["cache"]["target"], "memory");
    }

    #[tokio::test]
    async fn test_readyz_ok_without_cache() {
        let app = TestApp::new(AppState::new(Config::default(), CacheClient::disabled()));
        let response = app.get("/readyz").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["cache"]["ready"], false);
        assert_eq!(body["cache"]["target"], Value::Null);
    }

    // ==================== Auth ====================

    #[tokio::test]
    async fn test_register_login_me() {
        let app = TestApp::new(memory_state().await);
        let (token, id) = app.register("alice").await;

        let response = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let me = json_body(response).await;
        assert_eq!(me["id"], id.as_str());
        assert_eq!(me["username"], "alice");
        assert!(me.get("password_hash").is_none());

        let response = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "ALICE@example.com", "password": "correct horse battery" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["token"].is_string());
    }

    #[tokio::test]
    async fn test_auth_failures() {
        let app = TestApp::new(memory_state().await);
        app.register("alice").await;

        let response = app
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": "alice@example.com", "password": "wrong password" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.send(Method::GET, "/api/auth/me", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .send(Method::GET, "/api/auth/me", Some("not-a-jwt"), None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_registration() {
        let app = TestApp::new(memory_state().await);
        app.register("alice").await;

        let response = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({
                    "username": "alice",
                    "email": "other@example.com",
                    "password": "long enough",
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .send(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "username": "bob", "email": "bob@example.com", "password": "short" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ==================== Read-through ====================

    #[tokio::test]
    async fn test_post_list_miss_then_hit() {
        let app = TestApp::new(memory_state().await);

        let first = app.get("/api/posts").await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(x_cache(&first), Some("MISS"));
        assert_eq!(
            first.headers().get("x-cache-key").unwrap(),
            "GET:/api/posts"
        );
        assert_eq!(
            first.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=300"
        );
        let first_body = json_body(first).await;

        let second = app.get("/api/posts").await;
        assert_eq!(x_cache(&second), Some("HIT"));
        assert_eq!(json_body(second).await, first_body);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let app = TestApp::new(memory_state().await);
        let uri = format!("/api/posts/{}", Uuid::new_v4());

        for _ in 0..2 {
            let response = app.get(&uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(x_cache(&response), Some("MISS"));
        }
    }

    #[tokio::test]
    async fn test_bad_query_is_not_cached() {
        let app = TestApp::new(memory_state().await);

        for _ in 0..2 {
            let response = app.get("/api/posts?limit=500").await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(x_cache(&response), Some("MISS"));
        }
    }

    // ==================== Invalidation ====================

    #[tokio::test]
    async fn test_create_post_invalidates_lists() {
        let app = TestApp::new(memory_state().await);
        let (token, _) = app.register("alice").await;

        app.get("/api/posts").await;
        app.get("/api/posts?tag=rust").await;
        assert_eq!(x_cache(&app.get("/api/posts").await), Some("HIT"));

        app.create_post(&token, "Fresh").await;

        let response = app.get("/api/posts").await;
        assert_eq!(x_cache(&response), Some("MISS"));
        assert_eq!(json_body(response).await["total"], 1);

        let response = app.get("/api/posts?tag=rust").await;
        assert_eq!(x_cache(&response), Some("MISS"));
        assert_eq!(json_body(response).await["items"][0]["title"], "Fresh");
    }

    #[tokio::test]
    async fn test_head_never_serves_stale_list() {
        let app = TestApp::new(memory_state().await);
        let (token, _) = app.register("alice").await;

        let content_length = |response: &Response<Body>| {
            response
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        app.send(Method::HEAD, "/api/posts", None, None).await;
        let before = app.send(Method::HEAD, "/api/posts", None, None).await;
        assert_eq!(x_cache(&before), None);

        // HEAD left nothing behind for GET to hit.
        assert_eq!(x_cache(&app.get("/api/posts").await), Some("MISS"));

        app.create_post(&token, "Fresh").await;

        let after = app.send(Method::HEAD, "/api/posts", None, None).await;
        assert_eq!(x_cache(&after), None);
        assert_ne!(content_length(&before), content_length(&after));
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_cache() {
        let app = TestApp::new(memory_state().await);
        let (token, _) = app.register("alice").await;

        app.get("/api/posts").await;

        let response = app
            .send(
                Method::POST,
                "/api/posts",
                Some(&token),
                Some(json!({ "title": "", "body": "text" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(x_cache(&app.get("/api/posts").await), Some("HIT"));
    }

    #[tokio::test]
    async fn test_update_post_invalidates_only_that_post() {
        let app = TestApp::new(memory_state().await);
        let (token, _) = app.register("alice").await;
        let edited = app.create_post(&token, "Before").await;
        let untouched = app.create_post(&token, "Other").await;

        let edited_uri = format!("/api/posts/{edited}");
        let untouched_uri = format!("/api/posts/{untouched}");
        app.get("/api/posts").await;
        app.get(&edited_uri).await;
        app.get(&untouched_uri).await;

        let response = app
            .send(
                Method::PUT,
                &edited_uri,
                Some(&token),
                Some(json!({ "title": "After" })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.get(&edited_uri).await;
        assert_eq!(x_cache(&response), Some("MISS"));
        assert_eq!(json_body(response).await["title"], "After");

        assert_eq!(x_cache(&app.get("/api/posts").await), Some("MISS"));
        assert_eq!(x_cache(&app.get(&untouched_uri).await), Some("HIT"));
    }

    #[tokio::test]
    async fn test_non_author_cannot_update_and_cache_stays() {
        let app = TestApp::new(memory_state().await);
        let (alice, _) = app.register("alice").await;
        let (bob, _) = app.register("bob").await;
        let post_id = app.create_post(&alice, "Mine").await;
        let uri = format!("/api/posts/{post_id}");

        app.get(&uri).await;

        let response = app
            .send(Method::PUT, &uri, Some(&bob), Some(json!({ "title": "Yours" })))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.send(Method::DELETE, &uri, Some(&bob), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.get(&uri).await;
        assert_eq!(x_cache(&response), Some("HIT"));
        assert_eq!(json_body(response).await["title"], "Mine");
    }

    #[tokio::test]
    async fn test_delete_post() {
        let app = TestApp::new(memory_state().await);
        let (token, _) = app.register("alice").await;
        let post_id = app.create_post(&token, "Short lived").await;
        let uri = format!("/api/posts/{post_id}");

        assert_eq!(app.get(&uri).await.status(), StatusCode::OK);

        let response = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.get(&uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_profile_update_invalidates_user_views() {
        let app = TestApp::new(memory_state().await);
        let (token, id) = app.register("alice").await;
        let uri = format!("/api/users/{id}");

        assert_eq!(x_cache(&app.get(&uri).await), Some("MISS"));
        assert_eq!(x_cache(&app.get(&uri).await), Some("HIT"));

        let response = app
            .send(Method::PUT, &uri, Some(&token), Some(json!({ "bio": "Hello" })))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.get(&uri).await;
        assert_eq!(x_cache(&response), Some("MISS"));
        assert_eq!(json_body(response).await["bio"], "Hello");

        let response = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(json_body(response).await["bio"], "Hello");
    }

    #[tokio::test]
    async fn test_delete_user_removes_posts() {
        let app = TestApp::new(memory_state().await);
        let (token, id) = app.register("alice").await;
        app.create_post(&token, "Gone soon").await;

        let response = app.get("/api/posts").await;
        assert_eq!(json_body(response).await["total"], 1);

        let uri = format!("/api/users/{id}");
        let response = app.send(Method::DELETE, &uri, Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.get("/api/posts").await;
        assert_eq!(x_cache(&response), Some("MISS"));
        assert_eq!(json_body(response).await["total"], 0);

        let response = app.send(Method::GET, "/api/auth/me", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ==================== Fallback ====================

    #[tokio::test]
    async fn test_full_flow_without_cache() {
        let app = TestApp::new(AppState::new(Config::default(), CacheClient::disabled()));
        let (token, _) = app.register("alice").await;
        let post_id = app.create_post(&token, "No cache").await;

        let response = app.get(&format!("/api/posts/{post_id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(x_cache(&response), Some("MISS"));

        let response = app.get("/api/posts").await;
        assert_eq!(x_cache(&response), Some("MISS"));
        assert_eq!(json_body(response).await["total"], 1);
    }

    #[tokio::test]
    async fn test_unreachable_cache_serves_requests() {
        let connector = Arc::new(ScriptedConnector::new());
        connector.set_available(false);
        let client = CacheClient::new(connector, CacheSettings::default());
        assert!(!client.connect().await);

        let app = TestApp::new(AppState::new(Config::default(), client));
        let (token, _) = app.register("alice").await;
        app.create_post(&token, "Still works").await;

        let response = app.get("/api/posts").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["total"], 1);
    }
}
