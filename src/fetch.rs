//! Range fetcher for the actual-generation-per-unit endpoint.
//!
//! The upstream rejects spans longer than seven days, so longer ranges are
//! split into successive windows that overlap by one day. The final short
//! window is extended by one day because the upstream treats `end_date` as
//! exclusive.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Duration, FixedOffset, SecondsFormat};
use reqwest::StatusCode;
use tracing::{debug, info, instrument};

use crate::{
    error::{PipelineError, PipelineResult},
    models::{GenerationRecord, GenerationsResponse},
    token::TokenProvider,
};

// ---

/// Longest span the upstream accepts in one request.
pub const MAX_WINDOW_DAYS: i64 = 7;

/// What to do with the entries repeated by consecutive overlapping windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlapPolicy {
    /// Concatenate window results as returned, duplicates included.
    #[default]
    Preserve,
    /// Keep the first occurrence of each (unit, value start) pair.
    Deduplicate,
}

/// One `[start, end]` request window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl FetchWindow {
    // ---
    /// `(start_date, end_date)` as sent upstream.
    pub fn api_bounds(&self) -> (String, String) {
        (to_api_format(&self.start), to_api_format(&self.end))
    }
}

/// ISO-8601 with second precision and the original offset, e.g.
/// `2022-12-01T00:00:00+02:00`.
pub fn to_api_format(ts: &DateTime<FixedOffset>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn parse_api_date(value: &str) -> PipelineResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|e| PipelineError::InvalidDate {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Split a span longer than seven days into upstream-sized windows.
///
/// Each window ends at `min(start + 7d, end)`. A window shorter than seven
/// days is the last one and has its end pushed out by one day. Otherwise
/// the next window starts one day before the previous end.
///
/// Fails with [`PipelineError::InvalidDate`] when the final window would end
/// past the last representable timestamp.
pub fn plan_windows(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
) -> PipelineResult<Vec<FetchWindow>> {
    // ---
    let max_window = Duration::days(MAX_WINDOW_DAYS);
    let one_day = Duration::days(1);

    let mut windows = Vec::new();
    let mut window_start = start;

    while window_start < end {
        let mut window_end = window_start
            .checked_add_signed(max_window)
            .map_or(end, |full| full.min(end));
        let short = window_end - window_start < max_window;
        if short {
            window_end = window_end
                .checked_add_signed(one_day)
                .ok_or_else(|| out_of_range(&end))?;
        }

        windows.push(FetchWindow {
            start: window_start,
            end: window_end,
        });

        if short {
            break;
        }
        window_start = window_end - one_day;
    }

    Ok(windows)
}

fn out_of_range(ts: &DateTime<FixedOffset>) -> PipelineError {
    PipelineError::InvalidDate {
        value: to_api_format(ts),
        reason: "one day past it is out of range".to_string(),
    }
}

/// Drop value points already seen for the same unit, then records left empty.
pub fn dedupe_overlap(records: Vec<GenerationRecord>) -> Vec<GenerationRecord> {
    // ---
    let mut seen: HashSet<(String, DateTime<FixedOffset>)> = HashSet::new();

    records
        .into_iter()
        .filter_map(|mut record| {
            let had_values = !record.values.is_empty();
            let eic_code = record.unit.eic_code.clone();
            record
                .values
                .retain(|point| seen.insert((eic_code.clone(), point.start_date)));

            (!had_values || !record.values.is_empty()).then_some(record)
        })
        .collect()
}

/// Authenticated client for the generation endpoint.
pub struct GenerationClient {
    // ---
    http: reqwest::Client,
    url: String,
    tokens: Arc<TokenProvider>,
    overlap: OverlapPolicy,
}

impl GenerationClient {
    // ---
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        tokens: Arc<TokenProvider>,
        overlap: OverlapPolicy,
    ) -> Self {
        Self {
            http,
            url: url.into(),
            tokens,
            overlap,
        }
    }

    /// Fetch all generation records between two RFC 3339 timestamps.
    ///
    /// Spans of at most seven days go out as a single request with the
    /// inputs passed verbatim. Longer spans are fetched window by window,
    /// strictly in sequence; any failing window aborts the whole fetch.
    pub async fn fetch_generations(
        &self,
        start: &str,
        end: &str,
    ) -> PipelineResult<GenerationsResponse> {
        // ---
        let start_ts = parse_api_date(start)?;
        let end_ts = parse_api_date(end)?;

        if end_ts - start_ts <= Duration::days(MAX_WINDOW_DAYS) {
            let records = self.get_window(start, end).await?;
            return Ok(GenerationsResponse {
                actual_generations_per_unit: records,
            });
        }

        let windows = plan_windows(start_ts, end_ts)?;
        let mut records = self.fetch_windows(&windows).await?;

        if self.overlap == OverlapPolicy::Deduplicate {
            let before = records.len();
            records = dedupe_overlap(records);
            debug!("Overlap dedupe kept {} of {} records", records.len(), before);
        }

        Ok(GenerationsResponse {
            actual_generations_per_unit: records,
        })
    }

    /// Fetch each window in order and concatenate the results.
    #[instrument(skip_all, fields(windows = windows.len()))]
    async fn fetch_windows(
        &self,
        windows: &[FetchWindow],
    ) -> PipelineResult<Vec<GenerationRecord>> {
        // ---
        let mut records = Vec::new();
        for window in windows {
            let (start, end) = window.api_bounds();
            let mut chunk = self.get_window(&start, &end).await?;
            records.append(&mut chunk);
        }

        info!("Fetched {} records in {} windows", records.len(), windows.len());
        Ok(records)
    }

    async fn get_window(&self, start: &str, end: &str) -> PipelineResult<Vec<GenerationRecord>> {
        // ---
        let token = self.tokens.access_token().await?;
        debug!("Fetching window {} .. {}", start, end);

        let fetch_err = |source| PipelineError::Fetch {
            start: start.to_string(),
            end: end.to_string(),
            source,
        };

        let response = self
            .http
            .get(&self.url)
            .bearer_auth(&token)
            .query(&[("start_date", start), ("end_date", end)])
            .send()
            .await
            .map_err(fetch_err)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Rejected token; the next request starts with a fresh one
            self.tokens.invalidate();
        }

        let body: GenerationsResponse = response
            .error_for_status()
            .map_err(fetch_err)?
            .json()
            .await
            .map_err(fetch_err)?;

        debug!(
            "Window {} .. {} returned {} records",
            start,
            end,
            body.actual_generations_per_unit.len()
        );
        Ok(body.actual_generations_per_unit)
    }
}
