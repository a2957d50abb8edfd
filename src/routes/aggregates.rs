use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{AppState, RangeQuery, ResolvedRange};
use crate::{
    aggregate::{
        average_per_hour, cumulative_per_hour, sum_per_hour_per_day, DailyHourlySums,
        HourlyAverages,
    },
    transform::flatten,
    GenerationClient, PipelineError, PipelineResult,
};

// ---

/// The hourly views over one fetched range.
#[derive(Debug, Serialize)]
pub struct HourlyViews {
    pub start_date: String,
    pub end_date: String,
    pub record_count: usize,
    pub average_per_hour: HourlyAverages,
    pub cumulative_per_hour: HourlyAverages,
    pub sum_per_hour_per_day: DailyHourlySums,
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/aggregates", get(handler))
}

/// `GET /api/aggregates` - the dashboard's numbers as JSON.
#[instrument(name = "get_aggregates", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn handler(
    Query(params): Query<RangeQuery>,
    State((client, config)): State<AppState>,
) -> PipelineResult<Json<HourlyViews>> {
    // ---
    let range = params.resolve(&config)?;
    info!("GET /api/aggregates {} .. {}", range.start, range.end);
    Ok(Json(fetch_views(&client, range).await?))
}

/// Fetch the range and compute every view.
///
/// Short-circuits with [`PipelineError::EmptyDataset`] before flattening
/// when the upstream returns no records.
pub(super) async fn fetch_views(
    client: &GenerationClient,
    range: ResolvedRange,
) -> PipelineResult<HourlyViews> {
    // ---
    let data = client.fetch_generations(&range.start, &range.end).await?;
    let records = data.actual_generations_per_unit;
    if records.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let rows = flatten(&records)?;
    debug!("Aggregating {} rows", rows.len());

    let averages = average_per_hour(&rows);
    Ok(HourlyViews {
        start_date: range.start,
        end_date: range.end,
        record_count: records.len(),
        cumulative_per_hour: cumulative_per_hour(&averages),
        average_per_hour: averages,
        sum_per_hour_per_day: sum_per_hour_per_day(&rows),
    })
}
