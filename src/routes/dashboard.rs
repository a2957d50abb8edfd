use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{aggregates::fetch_views, aggregates::HourlyViews, AppState, RangeQuery};
use crate::PipelineError;

// ---

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    start_date: String,
    end_date: String,
    record_count: usize,
    averages: Vec<AverageRow>,
    days: Vec<DayView>,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    title: String,
    message: String,
}

struct HourCell {
    hour: String,
    value: String,
}

/// One row of the average table, with its running total.
struct AverageRow {
    hour: String,
    average: String,
    cumulative: String,
}

struct DayView {
    day: String,
    cells: Vec<HourCell>,
}

impl From<HourlyViews> for IndexTemplate {
    fn from(views: HourlyViews) -> Self {
        // ---
        let averages = views
            .average_per_hour
            .into_iter()
            .map(|(hour, average)| AverageRow {
                cumulative: views
                    .cumulative_per_hour
                    .get(&hour)
                    .map(|total| format!("{total:.2}"))
                    .unwrap_or_default(),
                average: format!("{average:.2}"),
                hour,
            })
            .collect();

        let days = views
            .sum_per_hour_per_day
            .into_iter()
            .map(|(day, hours)| DayView {
                day,
                cells: hours
                    .into_iter()
                    .map(|(hour, value)| HourCell {
                        hour,
                        value: format!("{value:.1}"),
                    })
                    .collect(),
            })
            .collect();

        IndexTemplate {
            start_date: views.start_date,
            end_date: views.end_date,
            record_count: views.record_count,
            averages,
            days,
        }
    }
}

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/", get(handler))
}

/// `GET /` - render the average, cumulative and per-day sum tables.
///
/// Errors, including an empty range, render the error page instead.
#[instrument(name = "get_dashboard", skip_all, fields(request_id = %Uuid::new_v4()))]
async fn handler(
    Query(params): Query<RangeQuery>,
    State((client, config)): State<AppState>,
) -> Response {
    // ---
    let views = match params.resolve(&config) {
        Ok(range) => {
            info!("GET / {} .. {}", range.start, range.end);
            fetch_views(&client, range).await
        }
        Err(e) => Err(e),
    };

    match views {
        Ok(views) => render(StatusCode::OK, IndexTemplate::from(views)),
        Err(e) => error_page(e),
    }
}

fn error_page(err: PipelineError) -> Response {
    // ---
    let status = err.status_code();
    let (title, message) = match &err {
        PipelineError::EmptyDataset => (
            "No data".to_string(),
            "No nuclear generation data was returned for the selected dates. \
             Try a different range."
                .to_string(),
        ),
        _ => (
            status.canonical_reason().unwrap_or("Error").to_string(),
            err.to_string(),
        ),
    };

    warn!(error = %err, "Rendering error page");
    render(status, ErrorTemplate { title, message })
}

fn render<T: Template>(status: StatusCode, template: T) -> Response {
    // ---
    match template.render() {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => PipelineError::from(e).into_response(),
    }
}
