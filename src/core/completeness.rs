//! Completeness analysis.
//!
//! Measures, per tracked field, how many records carry a present and
//! non-empty value. The field list comes from configuration, never from the
//! data, so a column that only shows up in some pages cannot skew the report.

use crate::core::scoring::percentage;
use crate::domain::model::{Field, RecordBatch};
use crate::domain::report::FieldCompletenessScore;
use crate::utils::error::{QualityError, Result};

/// Scores each of `fields` over `batch`.
///
/// An empty batch scores 0.0 for every field.
pub fn score(batch: &RecordBatch, fields: &[Field]) -> Result<FieldCompletenessScore> {
    ensure_distinct_fields(fields)?;

    let total = batch.len();
    let scores = fields
        .iter()
        .map(|&field| {
            let present = batch
                .iter()
                .filter(|record| record.get(field).is_present())
                .count();
            tracing::debug!("completeness {}: {}/{} present", field, present, total);
            (field, percentage(present, total))
        })
        .collect();

    Ok(FieldCompletenessScore::new(scores))
}

pub(crate) fn ensure_distinct_fields(fields: &[Field]) -> Result<()> {
    if fields.is_empty() {
        return Err(QualityError::ConfigValidationError {
            field: "analysis.fields".to_string(),
            message: "at least one field must be tracked".to_string(),
        });
    }

    for (index, field) in fields.iter().enumerate() {
        if fields[..index].contains(field) {
            return Err(QualityError::ConfigValidationError {
                field: "analysis.fields".to_string(),
                message: format!("field '{}' is listed more than once", field),
            });
        }
    }

    Ok(())
}
