//! Pattern-based cache invalidation after successful mutations.
//!
//! The handler always runs first and its response goes back to the client
//! untouched. Only when the status is 2xx are the configured patterns
//! cleared, in the background, so a slow or broken cache never delays the
//! write path.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{OriginalUri, RawPathParams, Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
    RequestPartsExt,
};
use futures_util::future::join_all;

use super::{buffer_response, rebuild};
use crate::cache::CacheClient;

/// What the pattern function gets to see of the request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: Method,
    /// Full path as sent by the client, including any nest prefix.
    pub path: String,
    /// Matched route parameters, e.g. `id` for `/posts/{id}`.
    pub params: HashMap<String, String>,
}

impl RequestInfo {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// What the pattern function gets to see of the response.
#[derive(Debug, Clone)]
pub struct ResponseInfo {
    pub status: StatusCode,
    /// The JSON body, when there is one.
    pub body: Option<serde_json::Value>,
}

pub type PatternFn = Arc<dyn Fn(&RequestInfo, &ResponseInfo) -> Vec<String> + Send + Sync>;

/// Where the patterns to clear come from.
#[derive(Clone)]
pub enum PatternSource {
    Single(String),
    List(Vec<String>),
    /// Computed per request. Only this variant buffers the response body.
    Dynamic(PatternFn),
}

impl PatternSource {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&RequestInfo, &ResponseInfo) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    fn resolve(&self, request: &RequestInfo, response: &ResponseInfo) -> Vec<String> {
        match self {
            Self::Single(pattern) => vec![pattern.clone()],
            Self::List(patterns) => patterns.clone(),
            Self::Dynamic(f) => f(request, response),
        }
    }
}

impl From<&str> for PatternSource {
    fn from(pattern: &str) -> Self {
        Self::Single(pattern.to_string())
    }
}

impl From<String> for PatternSource {
    fn from(pattern: String) -> Self {
        Self::Single(pattern)
    }
}

impl From<Vec<String>> for PatternSource {
    fn from(patterns: Vec<String>) -> Self {
        Self::List(patterns)
    }
}

/// Invalidation configuration for one route.
#[derive(Clone)]
pub struct InvalidateCache {
    client: CacheClient,
    patterns: PatternSource,
}

impl InvalidateCache {
    pub fn new(client: CacheClient, patterns: impl Into<PatternSource>) -> Self {
        Self {
            client,
            patterns: patterns.into(),
        }
    }
}

/// Clears every pattern, tolerating individual failures. Returns the number
/// of keys deleted and the number of patterns that failed.
async fn clear_patterns(client: CacheClient, patterns: Vec<String>) -> (u64, usize) {
    let results = join_all(patterns.iter().map(|p| client.try_clear_by_pattern(p))).await;

    // Each failure is already logged by the client; only count them here.
    let mut deleted = 0u64;
    let mut failed = 0usize;
    for result in results {
        match result {
            Ok(n) => deleted += n,
            Err(_) => failed += 1,
        }
    }

    tracing::debug!(deleted, patterns = patterns.len(), "Cache invalidated");
    if failed > 0 {
        tracing::warn!(
            failed,
            total = patterns.len(),
            "Cache invalidation partially failed"
        );
    }

    (deleted, failed)
}

/// Invalidation middleware. Mount with
/// `axum::middleware::from_fn_with_state(InvalidateCache, invalidate)`.
pub async fn invalidate(
    State(cache): State<InvalidateCache>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path().to_string(), |o| o.0.path().to_string());
    let params = parts
        .extract::<RawPathParams>()
        .await
        .map(|raw| {
            raw.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let info = RequestInfo {
        method: parts.method.clone(),
        path,
        params,
    };

    let response = next.run(Request::from_parts(parts, body)).await;
    if !response.status().is_success() {
        return response;
    }

    let (response, body) = match &cache.patterns {
        PatternSource::Dynamic(_) => match buffer_response(response).await {
            Ok((parts, bytes)) => {
                let json = serde_json::from_slice::<serde_json::Value>(&bytes).ok();
                (rebuild(parts, bytes), json)
            }
            Err(error_response) => return error_response,
        },
        _ => (response, None),
    };

    let outcome = ResponseInfo {
        status: response.status(),
        body,
    };
    let patterns = cache.patterns.resolve(&info, &outcome);
    if !patterns.is_empty() {
        tracing::debug!(path = %info.path, patterns = ?patterns, "Scheduling cache invalidation");
        let client = cache.client.clone();
        cache.client.spawn_detached(async move {
            clear_patterns(client, patterns).await;
        });
    }

    response
}
