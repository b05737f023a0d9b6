//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/readyz` - Readiness plus cache status. The cache is optional, so an
//!   unavailable cache is reported but never fails the probe.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /livez - Basic liveness probe.
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /readyz - Readiness probe with the cache client's view of itself.
pub async fn readyz(State(state): State<AppState>) -> Json<Value> {
    let cache = &state.cache;
    Json(json!({
        "status": "ok",
        "cache": {
            "ready": cache.is_ready(),
            "state": cache.connection_state(),
            "breaker": cache.breaker_snapshot(),
            "target": cache.target(),
        }
    }))
}
