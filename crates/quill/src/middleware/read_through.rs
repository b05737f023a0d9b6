//! Read-through response cache.
//!
//! On a GET request the middleware looks the request key up in the cache. A hit is answered from the cache without running the handler. A
//! miss runs the handler and, for 2xx responses, stores the response in the
//! background. A cache error runs the handler and leaves the cache alone.
//!
//! Every cacheable response carries `X-Cache`, `X-Cache-Key` and
//! `Cache-Control` headers. HEAD requests pass straight through: invalidation
//! patterns only cover `GET:` keys.

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Request, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE},
        request::Parts,
        HeaderName, HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use quill_core::cache::{request_key, CacheStatus};

use super::{buffer_response, rebuild};
use crate::cache::CacheClient;

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_CACHE_KEY: HeaderName = HeaderName::from_static("x-cache-key");

/// Default response TTL: five minutes.
pub const DEFAULT_TTL_SECONDS: u64 = 300;

pub type KeyFn = Arc<dyn Fn(&Parts) -> String + Send + Sync>;

/// `"{METHOD}:{path_and_query}"` using the URI as the client sent it, so
/// routes nested under a prefix still get their full path in the key.
pub fn default_cache_key(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
    request_key(parts.method.as_str(), path_and_query)
}

/// Read-through cache configuration for one route.
#[derive(Clone)]
pub struct ReadThroughCache {
    client: CacheClient,
    key_fn: KeyFn,
    ttl_seconds: u64,
    skip: bool,
}

impl ReadThroughCache {
    pub fn new(client: CacheClient) -> Self {
        Self {
            client,
            key_fn: Arc::new(default_cache_key),
            ttl_seconds: DEFAULT_TTL_SECONDS,
            skip: false,
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    pub fn with_key_fn<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&Parts) -> String + Send + Sync + 'static,
    {
        self.key_fn = Arc::new(key_fn);
        self
    }

    /// Turns the middleware into a pass-through.
    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }
}

/// A response as stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response = (status, self.body).into_response();
        match self.content_type.map(HeaderValue::try_from) {
            Some(Ok(content_type)) => {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            _ => {
                response.headers_mut().remove(CONTENT_TYPE);
            }
        }
        response
    }
}

fn annotate(response: &mut Response, status: CacheStatus, key: &str, ttl_seconds: u64) {
    let headers = response.headers_mut();
    headers.insert(X_CACHE, HeaderValue::from_static(status.as_str()));
    if let Ok(value) = HeaderValue::from_str(key) {
        headers.insert(X_CACHE_KEY, value);
    }
    let directive = match status {
        CacheStatus::Error => "no-cache".to_string(),
        CacheStatus::Hit | CacheStatus::Miss => format!("public, max-age={ttl_seconds}"),
    };
    if let Ok(value) = HeaderValue::from_str(&directive) {
        headers.insert(CACHE_CONTROL, value);
    }
}

/// Runs the handler and schedules a cache write if the response is 2xx.
async fn fill(cache: &ReadThroughCache, key: &str, response: Response) -> Response {
    if !response.status().is_success() {
        return response;
    }

    let (parts, bytes) = match buffer_response(response).await {
        Ok(buffered) => buffered,
        Err(error_response) => return error_response,
    };

    let Ok(body) = std::str::from_utf8(&bytes) else {
        tracing::debug!(key, "Not caching a non UTF-8 response body");
        return rebuild(parts, bytes);
    };

    let entry = CachedResponse {
        status: parts.status.as_u16(),
        content_type: parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.to_string(),
    };

    let client = cache.client.clone();
    let key = key.to_string();
    let ttl_seconds = cache.ttl_seconds;
    cache.client.spawn_detached(async move {
        if client.set(&key, &entry, ttl_seconds).await {
            tracing::debug!(key = %key, ttl_seconds, "Cached response");
        }
    });

    rebuild(parts, bytes)
}

/// Read-through cache middleware. Mount with
/// `axum::middleware::from_fn_with_state(ReadThroughCache, read_through)`.
pub async fn read_through(
    State(cache): State<ReadThroughCache>,
    request: Request,
    next: Next,
) -> Response {
    if cache.skip || request.method() != Method::GET {
        return next.run(request).await;
    }

    let (parts, body) = request.into_parts();
    let key = (cache.key_fn)(&parts);
    let request = Request::from_parts(parts, body);

    let (status, mut response) = match cache.client.try_get::<CachedResponse>(&key).await {
        Ok(Some(cached)) => {
            tracing::debug!(key = %key, "Cache hit");
            (CacheStatus::Hit, cached.into_response())
        }
        Ok(None) => {
            tracing::debug!(key = %key, "Cache miss");
            let response = next.run(request).await;
            (CacheStatus::Miss, fill(&cache, &key, response).await)
        }
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "Cache lookup failed, serving fresh response");
            (CacheStatus::Error, next.run(request).await)
        }
    };

    annotate(&mut response, status, &key, cache.ttl_seconds);
    response
}
