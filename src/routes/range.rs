//! Date-range query shared by the dashboard, data and aggregate routes.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    error::{PipelineError, PipelineResult},
    fetch::{parse_api_date, to_api_format},
    Config,
};

// ---

/// `?start_date=&end_date=` with an inclusive end.
///
/// Each bound is either a plain `YYYY-MM-DD` date (midnight in the
/// configured offset) or a full RFC 3339 timestamp.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Upstream-ready bounds; `end` is the exclusive end, one day past the
/// requested end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    pub start: String,
    pub end: String,
}

impl RangeQuery {
    // ---
    pub fn resolve(&self, config: &Config) -> PipelineResult<ResolvedRange> {
        // ---
        let start = match non_empty(&self.start_date) {
            Some(value) => parse_bound(value, config.utc_offset)?,
            None => midnight(config.default_start, config.utc_offset, "DEFAULT_START_DATE")?,
        };
        let end = match non_empty(&self.end_date) {
            Some(value) => parse_bound(value, config.utc_offset)?,
            None => midnight(config.default_end, config.utc_offset, "DEFAULT_END_DATE")?,
        };

        if end < start {
            return Err(PipelineError::InvalidRange {
                start: to_api_format(&start),
                end: to_api_format(&end),
            });
        }

        let exclusive_end = end
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| PipelineError::InvalidDate {
                value: to_api_format(&end),
                reason: "the day after it is out of range".to_string(),
            })?;

        let too_long = exclusive_end - start > Duration::days(config.max_range_days.into());
        let range = ResolvedRange {
            start: to_api_format(&start),
            end: to_api_format(&exclusive_end),
        };

        if too_long {
            return Err(PipelineError::RangeTooLong {
                start: range.start,
                end: range.end,
                max_days: config.max_range_days,
            });
        }
        Ok(range)
    }
}

/// Empty form fields (`?start_date=`) fall back to the defaults.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(value: &str, offset: FixedOffset) -> PipelineResult<DateTime<FixedOffset>> {
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(day) => midnight(day, offset, value),
        Err(_) => parse_api_date(value),
    }
}

fn midnight(
    day: NaiveDate,
    offset: FixedOffset,
    source: &str,
) -> PipelineResult<DateTime<FixedOffset>> {
    day.and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(offset).single())
        .ok_or_else(|| PipelineError::InvalidDate {
            value: source.to_string(),
            reason: "no midnight in the configured offset".to_string(),
        })
}
