//! Configuration loader for the `nuclear-genflow` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). No other module reads the environment.
//!
use std::{env, net::SocketAddr, time::Duration};

use anyhow::{anyhow, Result};
use chrono::{FixedOffset, NaiveDate};

use crate::fetch::OverlapPolicy;

/// Parse an optional environment variable with a default value.
macro_rules! parse_env {
    ($lookup:expr, $var_name:expr, $ty:ty, $default:expr) => {
        $lookup($var_name)
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($lookup:expr, $var_name:expr) => {
        $lookup($var_name)
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// OAuth2 client-credentials token endpoint.
    pub token_url: String,

    /// Client ID for the token exchange.
    pub client_id: String,

    /// Client secret for the token exchange. Never logged.
    pub client_secret: String,

    /// Actual generation per unit endpoint.
    pub generation_url: String,

    /// Address the dashboard listens on.
    pub bind_addr: SocketAddr,

    /// Timeout applied to every upstream request.
    pub http_timeout: Duration,

    /// Handling of the one-day overlap between fetch windows.
    pub overlap: OverlapPolicy,

    /// First day shown when the dashboard is opened without a range.
    pub default_start: NaiveDate,

    /// Last day (inclusive) shown when the dashboard is opened without a range.
    pub default_end: NaiveDate,

    /// Offset applied to plain `YYYY-MM-DD` dates in range queries.
    pub utc_offset: FixedOffset,

    /// Longest range, in days, a single query may ask for.
    pub max_range_days: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `TOKEN_URL` – OAuth2 token endpoint
/// - `CLIENT_ID` / `SECRET_ID` – client credentials
/// - `ACTUAL_GENERATION_PER_UNIT_URL` – generation data endpoint
///
/// Optional:
/// - `BIND_ADDR` – listen address (default: 0.0.0.0:8080)
/// - `HTTP_TIMEOUT_SECS` – upstream request timeout (default: 30)
/// - `DEDUPLICATE_OVERLAP` – drop overlap duplicates (default: false)
/// - `DEFAULT_START_DATE` / `DEFAULT_END_DATE` – default range (2022-12-01 .. 2022-12-10)
/// - `DASHBOARD_UTC_OFFSET` – offset for plain dates (default: +02:00)
/// - `MAX_RANGE_DAYS` – longest accepted query range (default: 366)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    load_with(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_with<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    // ---
    let token_url = require_env!(lookup, "TOKEN_URL");
    let client_id = require_env!(lookup, "CLIENT_ID");
    let client_secret = require_env!(lookup, "SECRET_ID");
    let generation_url = require_env!(lookup, "ACTUAL_GENERATION_PER_UNIT_URL");

    let default_addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    let bind_addr = parse_env!(lookup, "BIND_ADDR", SocketAddr, default_addr);
    let http_timeout_secs = parse_env!(lookup, "HTTP_TIMEOUT_SECS", u64, 30);
    let dedupe = parse_env!(lookup, "DEDUPLICATE_OVERLAP", bool, false);
    let default_start = parse_env!(lookup, "DEFAULT_START_DATE", NaiveDate, ymd(2022, 12, 1)?);
    let default_end = parse_env!(lookup, "DEFAULT_END_DATE", NaiveDate, ymd(2022, 12, 10)?);
    let utc_offset = parse_env!(lookup, "DASHBOARD_UTC_OFFSET", FixedOffset, hours_east(2)?);
    let max_range_days = parse_env!(lookup, "MAX_RANGE_DAYS", u32, 366);

    if max_range_days == 0 {
        return Err(anyhow!("MAX_RANGE_DAYS must be at least 1"));
    }
    if (default_end - default_start).num_days() >= i64::from(max_range_days) {
        return Err(anyhow!(
            "default range {default_start} .. {default_end} exceeds MAX_RANGE_DAYS ({max_range_days})"
        ));
    }

    if default_end < default_start {
        return Err(anyhow!(
            "DEFAULT_END_DATE ({default_end}) is before DEFAULT_START_DATE ({default_start})"
        ));
    }

    let overlap = if dedupe {
        OverlapPolicy::Deduplicate
    } else {
        OverlapPolicy::Preserve
    };

    Ok(Config {
        token_url,
        client_id,
        client_secret,
        generation_url,
        bind_addr,
        http_timeout: Duration::from_secs(http_timeout_secs),
        overlap,
        default_start,
        default_end,
        utc_offset,
        max_range_days,
    })
}

fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| anyhow!("invalid date {year}-{month}-{day}"))
}

fn hours_east(hours: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(hours * 3600).ok_or_else(|| anyhow!("invalid offset {hours}h"))
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// The client secret is masked; everything else is shown as loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  TOKEN_URL                      : {}", self.token_url);
        tracing::info!("  CLIENT_ID                      : {}", self.client_id);
        tracing::info!("  SECRET_ID                      : {}", mask(&self.client_secret));
        tracing::info!("  ACTUAL_GENERATION_PER_UNIT_URL : {}", self.generation_url);
        tracing::info!("  BIND_ADDR                      : {}", self.bind_addr);
        tracing::info!("  HTTP_TIMEOUT_SECS              : {}", self.http_timeout.as_secs());
        tracing::info!("  DEDUPLICATE_OVERLAP            : {:?}", self.overlap);
        tracing::info!("  DEFAULT_START_DATE             : {}", self.default_start);
        tracing::info!("  DEFAULT_END_DATE               : {}", self.default_end);
        tracing::info!("  DASHBOARD_UTC_OFFSET           : {}", self.utc_offset);
        tracing::info!("  MAX_RANGE_DAYS                 : {}", self.max_range_days);
    }
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => String::new(),
        n if n <= 4 => "****".to_string(),
        _ => format!("{}****", secret.chars().take(2).collect::<String>()),
    }
}
