//! Route gateway: merges the per-endpoint subrouters and attaches state.

use std::sync::Arc;

use axum::Router;

use crate::{Config, GenerationClient};

mod aggregates;
mod dashboard;
mod data;
mod health;
mod range;

pub use range::{RangeQuery, ResolvedRange};

// ---

/// Shared state handed to every handler.
pub type AppState = (Arc<GenerationClient>, Config);

pub fn router(client: Arc<GenerationClient>, config: Config) -> Router {
    // ---
    Router::new()
        .merge(dashboard::router())
        .merge(data::router())
        .merge(aggregates::router())
        .merge(health::router())
        .with_state((client, config))
}
