//! Data models for the actual-generation-per-unit pipeline.
//!
//! The upstream payload is nested: one [`GenerationRecord`] per unit and
//! period, each carrying a list of hourly [`ValuePoint`]s. The flattener
//! turns that shape into one [`FlatRow`] per (unit, value point).

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ---

/// Production type retained by the flattener.
pub const NUCLEAR: &str = "NUCLEAR";

/// Body of `GET <ACTUAL_GENERATION_PER_UNIT_URL>`.
///
/// A missing `actual_generations_per_unit` key is read as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationsResponse {
    // ---
    #[serde(default)]
    pub actual_generations_per_unit: Vec<GenerationRecord>,
}

/// One unit-period entry from the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    // ---
    pub unit: Unit,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub values: Vec<ValuePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    // ---
    pub eic_code: String,
    pub name: String,
    pub production_type: String,
}

/// One hourly measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePoint {
    // ---
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub updated_date: DateTime<FixedOffset>,
    pub value: f64,
}

/// Flattened (unit, value point) row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow {
    // ---
    pub unit_eic_code: String,
    pub unit_name: String,
    pub unit_production_type: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    pub value_start_date: DateTime<FixedOffset>,
    pub value_end_date: DateTime<FixedOffset>,
    pub value_updated_date: DateTime<FixedOffset>,
    pub value: f64,
}

/// Body of the client-credentials token exchange.
///
/// Every field is optional on the wire so that a missing `access_token`
/// surfaces as a typed error rather than a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    // ---
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
}

impl GenerationRecord {
    // ---
    pub fn is_nuclear(&self) -> bool {
        self.unit.production_type == NUCLEAR
    }

    /// Expand the record into one row per value point.
    pub fn to_flat_rows(&self) -> impl Iterator<Item = FlatRow> + '_ {
        // ---
        self.values.iter().map(move |point| FlatRow {
            unit_eic_code: self.unit.eic_code.clone(),
            unit_name: self.unit.name.clone(),
            unit_production_type: self.unit.production_type.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            value_start_date: point.start_date,
            value_end_date: point.end_date,
            value_updated_date: point.updated_date,
            value: point.value,
        })
    }
}
