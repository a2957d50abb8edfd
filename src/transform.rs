//! Flattening of nested generation records into tabular rows.

use tracing::{debug, warn};

use crate::{
    error::{PipelineError, PipelineResult},
    models::{FlatRow, GenerationRecord},
};

// ---

/// Flatten records into one row per (nuclear unit, value point).
///
/// Non-nuclear records are dropped. An empty input is rejected with
/// [`PipelineError::EmptyDataset`]; callers are expected to check for
/// that before flattening.
pub fn flatten(records: &[GenerationRecord]) -> PipelineResult<Vec<FlatRow>> {
    // ---
    if records.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }

    let mut rows = Vec::new();
    for record in records.iter().filter(|r| r.is_nuclear()) {
        for row in record.to_flat_rows() {
            if row.value_start_date < row.start_date || row.value_start_date >= row.end_date {
                warn!(
                    unit = %row.unit_eic_code,
                    value_start = %row.value_start_date,
                    "Value point starts outside its record period"
                );
            }
            rows.push(row);
        }
    }

    debug!(
        "Flattened {} records into {} nuclear rows",
        records.len(),
        rows.len()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::GenerationsResponse;

    const FIXTURE: &str = include_str!("../tests/fixtures/generations_2022_12_01.json");

    fn fixture_records() -> Vec<GenerationRecord> {
        serde_json::from_str::<GenerationsResponse>(FIXTURE)
            .unwrap()
            .actual_generations_per_unit
    }

    #[test]
    fn test_only_nuclear_rows_survive() {
        // ---
        let records = fixture_records();
        let rows = flatten(&records).unwrap();

        let expected: usize = records
            .iter()
            .filter(|r| r.unit.production_type == "NUCLEAR")
            .map(|r| r.values.len())
            .sum();
        assert_eq!(rows.len(), expected);
        assert_eq!(rows.len(), 24);
        assert!(rows.iter().all(|r| r.unit_production_type == "NUCLEAR"));
        assert!(rows.iter().all(|r| r.unit_name == "BELLEVILLE 1"));
    }

    #[test]
    fn test_rows_follow_value_order() {
        // ---
        let records = fixture_records();
        let rows = flatten(&records).unwrap();

        assert_eq!(rows[0].value, 1287.5);
        assert_eq!(rows[1].value, 1288.5);
        assert_eq!(rows[23].value, 1289.0);
        assert_eq!(rows[5].value_start_date, records[0].values[5].start_date);
        assert_eq!(rows[5].value_updated_date, records[0].values[5].updated_date);
    }

    #[test]
    fn test_no_nuclear_records_gives_no_rows() {
        // ---
        let records: Vec<GenerationRecord> = fixture_records()
            .into_iter()
            .filter(|r| !r.is_nuclear())
            .collect();
        assert!(flatten(&records).unwrap().is_empty());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        // ---
        let err = flatten(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }
}
