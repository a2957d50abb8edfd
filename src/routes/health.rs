// src/routes/health.rs
//! Liveness endpoint for the generation dashboard.
//!
//! `/health` answers without touching the token endpoint or the generation
//! API, so it reports whether this process is serving, not whether the
//! upstream is reachable.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the state type so the gateway can merge it with the
/// stateful routers.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
