//! Timeliness analysis: how old each record is relative to a reference time.

use crate::core::scoring::round_one_decimal;
use crate::domain::model::{Field, FieldKind, RecordBatch};
use crate::domain::report::TimelinessSummary;
use crate::utils::error::{QualityError, Result};
use chrono::{DateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days between `created` and `reference_time`, floored.
///
/// Future-dated records yield negative ages.
pub fn age_in_days(reference_time: DateTime<Utc>, created: DateTime<Utc>) -> i64 {
    let elapsed = reference_time - created;
    // num_seconds truncates toward zero; step down when a fraction is left over.
    let seconds = elapsed.num_seconds() - i64::from(elapsed.subsec_nanos() < 0);
    seconds.div_euclid(SECONDS_PER_DAY)
}

/// Summarizes record ages for `date_field`.
///
/// Records without a date, or with a date that does not parse, are left out
/// of the statistics and counted separately.
pub fn summarize(
    batch: &RecordBatch,
    date_field: Field,
    reference_time: DateTime<Utc>,
) -> Result<TimelinessSummary> {
    if date_field.kind() != FieldKind::Timestamp {
        return Err(QualityError::InvalidConfigValueError {
            field: "analysis.date_field".to_string(),
            value: date_field.name().to_string(),
            reason: "timeliness needs a timestamp field".to_string(),
        });
    }

    let mut ages: Vec<i64> = Vec::with_capacity(batch.len());
    let mut missing_records = 0;
    let mut malformed_records = 0;

    for (index, record) in batch.iter().enumerate() {
        match record.get(date_field).as_timestamp(date_field) {
            Ok(Some(created)) => ages.push(age_in_days(reference_time, created)),
            Ok(None) => missing_records += 1,
            Err(e) => {
                malformed_records += 1;
                tracing::debug!("record {} excluded from timeliness: {}", index, e);
            }
        }
    }

    if malformed_records > 0 {
        tracing::warn!(
            "{} record(s) have an unparseable {} and were excluded from timeliness",
            malformed_records,
            date_field
        );
    }

    let (Some(&oldest), Some(&newest)) = (ages.iter().max(), ages.iter().min()) else {
        return Ok(TimelinessSummary {
            missing_records,
            malformed_records,
            ..TimelinessSummary::default()
        });
    };

    let average = ages.iter().map(|&age| age as f64).sum::<f64>() / ages.len() as f64;

    Ok(TimelinessSummary {
        average_age_days: round_one_decimal(average),
        oldest_record_days: oldest,
        newest_record_days: newest,
        measured_records: ages.len(),
        missing_records,
        malformed_records,
    })
}
