//! Nuclear generation pipeline: token acquisition, chunked range fetching,
//! flattening and hourly aggregation, plus the axum routes that serve it.
//!
//! The re-exports below are the surface `main.rs` and the routes build on
//! (EMBP: `main.rs` only talks to this gateway).

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod routes;
pub mod token;
pub mod transform;

pub use config::Config;
pub use error::{PipelineError, PipelineResult};
pub use fetch::{GenerationClient, OverlapPolicy};
pub use models::{FlatRow, GenerationRecord, GenerationsResponse, Unit, ValuePoint};
pub use token::{TokenCache, TokenProvider};

use std::sync::Arc;

use anyhow::Result;

// ---

/// Build the shared HTTP client, token provider and generation client.
///
/// One `reqwest::Client` is shared by the token and data calls so both use
/// the configured timeout and the same connection pool.
pub fn build_client(cfg: &Config) -> Result<Arc<GenerationClient>> {
    // ---
    let http = reqwest::Client::builder()
        .timeout(cfg.http_timeout)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

    let tokens = Arc::new(TokenProvider::new(
        http.clone(),
        cfg.token_url.clone(),
        cfg.client_id.clone(),
        cfg.client_secret.clone(),
    ));

    Ok(Arc::new(GenerationClient::new(
        http,
        cfg.generation_url.clone(),
        tokens,
        cfg.overlap,
    )))
}
