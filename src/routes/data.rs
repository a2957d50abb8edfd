use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{AppState, RangeQuery};
use crate::{GenerationsResponse, PipelineResult};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/data", get(handler))
}

/// `GET /data` - raw upstream records for the requested range.
#[instrument(name = "get_data", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn handler(
    Query(params): Query<RangeQuery>,
    State((client, config)): State<AppState>,
) -> PipelineResult<Json<GenerationsResponse>> {
    // ---
    let range = params.resolve(&config)?;
    info!("GET /data {} .. {}", range.start, range.end);

    let data = client.fetch_generations(&range.start, &range.end).await?;
    info!(
        "GET /data returning {} records",
        data.actual_generations_per_unit.len()
    );
    Ok(Json(data))
}
