//! Cache middleware for axum routes.
//!
//! - [`read_through`] serves GET responses from the cache and fills it on a
//!   miss.
//! - [`invalidate`] clears cache patterns after a successful mutation.
//!
//! Both are plain `from_fn_with_state` middleware functions configured by a
//! cloneable state value.

pub mod invalidate;
pub mod read_through;

use axum::{
    body::{Body, Bytes},
    http::{response::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::BodyExt;

pub use invalidate::{invalidate, InvalidateCache, PatternSource, RequestInfo, ResponseInfo};
pub use read_through::{read_through, ReadThroughCache};

/// Collects a response body so it can be inspected and sent again.
///
/// If the body cannot be read the response is lost, so a 500 is returned
/// in its place.
async fn buffer_response(response: Response) -> Result<(Parts, Bytes), Response> {
    let (parts, body) = response.into_parts();
    match body.collect().await {
        Ok(collected) => Ok((parts, collected.to_bytes())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response body");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

fn rebuild(parts: Parts, bytes: Bytes) -> Response {
    Response::from_parts(parts, Body::from(bytes))
}
