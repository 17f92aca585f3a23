//! Distinct-value profile of categorical fields.

use crate::core::completeness::ensure_distinct_fields;
use crate::core::scoring::{percentage, round_one_decimal};
use crate::domain::model::{Field, FieldValue, RecordBatch};
use crate::domain::report::{CardinalityProfile, FieldCardinality, ValueCount};
use crate::utils::error::Result;
use std::collections::HashMap;

const MOST_COMMON_LIMIT: usize = 3;

fn value_key(value: &FieldValue) -> Option<String> {
    if !value.is_present() {
        return None;
    }
    match value {
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Number(n) => Some(n.to_string()),
        FieldValue::Timestamp(ts) => Some(ts.to_rfc3339()),
        FieldValue::Absent => None,
    }
}

/// Profiles each of `fields`. A field whose distinct ratio exceeds
/// `high_cardinality_threshold` (a percentage) is flagged.
pub fn profile(
    batch: &RecordBatch,
    fields: &[Field],
    high_cardinality_threshold: f64,
) -> Result<CardinalityProfile> {
    if fields.is_empty() {
        return Ok(CardinalityProfile::default());
    }
    ensure_distinct_fields(fields)?;

    let total = batch.len();
    let profiles = fields
        .iter()
        .map(|&field| {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for key in batch.iter().filter_map(|r| value_key(r.get(field))) {
                *counts.entry(key).or_insert(0) += 1;
            }

            let unique_values = counts.len();
            let unique_ratio = percentage(unique_values, total);

            let mut most_common: Vec<ValueCount> = counts
                .into_iter()
                .map(|(value, count)| ValueCount { value, count })
                .collect();
            // Ties break on the value so output stays deterministic.
            most_common.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            most_common.truncate(MOST_COMMON_LIMIT);

            (
                field,
                FieldCardinality {
                    unique_values,
                    unique_ratio,
                    high_cardinality: unique_ratio > round_one_decimal(high_cardinality_threshold),
                    most_common,
                },
            )
        })
        .collect();

    Ok(CardinalityProfile::new(profiles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;

    fn complaints(values: &[&str]) -> RecordBatch {
        values
            .iter()
            .map(|v| Record::new().with_raw(Field::ComplaintType, v))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_profile_most_common() {
        let batch = complaints(&["Noise", "Noise", "Rodent", "Heat", "Noise", "Rodent", ""]);

        let profile = profile(&batch, &[Field::ComplaintType], 80.0).unwrap();
        let complaint = profile.get(Field::ComplaintType).unwrap();

        assert_eq!(complaint.unique_values, 3);
        assert_eq!(complaint.unique_ratio, 42.9);
        assert!(!complaint.high_cardinality);
        let top: Vec<(&str, usize)> = complaint
            .most_common
            .iter()
            .map(|v| (v.value.as_str(), v.count))
            .collect();
        assert_eq!(top, vec![("Noise", 3), ("Rodent", 2), ("Heat", 1)]);
    }

    #[test]
    fn test_profile_flags_high_cardinality() {
        let batch = complaints(&["a", "b", "c", "d", "e"]);

        let profile = profile(&batch, &[Field::ComplaintType], 80.0).unwrap();

        assert!(profile.get(Field::ComplaintType).unwrap().high_cardinality);
    }

    #[test]
    fn test_profile_empty_batch() {
        let profile = profile(&RecordBatch::default(), &[Field::Borough], 80.0).unwrap();
        let borough = profile.get(Field::Borough).unwrap();

        assert_eq!(borough.unique_values, 0);
        assert_eq!(borough.unique_ratio, 0.0);
        assert!(borough.most_common.is_empty());
    }

    #[test]
    fn test_profile_without_fields() {
        let profile = profile(&complaints(&["Noise"]), &[], 80.0).unwrap();
        assert!(profile.is_empty());
    }
}
