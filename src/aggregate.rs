//! Hourly aggregations over flattened rows.
//!
//! Both views key on the wall-clock hour of `value_start_date` in its own
//! UTC offset. No DST adjustment is made and missing hours are not filled.
//! The cumulative series is derived from the hourly averages.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Timelike};

use crate::models::FlatRow;

// ---

/// `"Hour HH"` -> mean value across the whole range.
pub type HourlyAverages = BTreeMap<String, f64>;

/// `"YYYY-MM-DD"` -> `"Hour HH"` -> summed value.
pub type DailyHourlySums = BTreeMap<String, BTreeMap<String, f64>>;

/// Zero-padded hour label, e.g. `Hour 07`.
pub fn hour_label(hour: u32) -> String {
    format!("Hour {hour:02}")
}

/// Mean of `value` per hour of day, ignoring the date.
pub fn average_per_hour(rows: &[FlatRow]) -> HourlyAverages {
    // ---
    let mut buckets: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for row in rows {
        let bucket = buckets.entry(row.value_start_date.hour()).or_default();
        bucket.0 += row.value;
        bucket.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(hour, (sum, count))| (hour_label(hour), sum / count as f64))
        .collect()
}

/// Running total of the hourly averages, in hour order.
pub fn cumulative_per_hour(averages: &HourlyAverages) -> HourlyAverages {
    // ---
    let mut total = 0.0;
    averages
        .iter()
        .map(|(hour, average)| {
            total += average;
            (hour.clone(), total)
        })
        .collect()
}

/// Sum of `value` per hour, per calendar day.
pub fn sum_per_hour_per_day(rows: &[FlatRow]) -> DailyHourlySums {
    // ---
    let mut buckets: BTreeMap<(NaiveDate, u32), f64> = BTreeMap::new();
    for row in rows {
        let ts = row.value_start_date;
        *buckets.entry((ts.date_naive(), ts.hour())).or_default() += row.value;
    }

    let mut sums = DailyHourlySums::new();
    for ((day, hour), sum) in buckets {
        sums.entry(day.format("%Y-%m-%d").to_string())
            .or_default()
            .insert(hour_label(hour), sum);
    }
    sums
}
