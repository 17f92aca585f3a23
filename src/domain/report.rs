//! Report values produced by the quality engine.
//!
//! Keyed metrics keep the order in which fields or rules were configured and
//! serialize as JSON objects in that order, so two runs over the same batch
//! produce byte-identical output.

use crate::domain::model::Field;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Field name -> percentage of records with a usable value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldCompletenessScore {
    scores: Vec<(Field, f64)>,
}

impl FieldCompletenessScore {
    pub fn new(scores: Vec<(Field, f64)>) -> Self {
        Self { scores }
    }

    pub fn get(&self, field: Field) -> Option<f64> {
        self.scores
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, f64)> + '_ {
        self.scores.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl Serialize for FieldCompletenessScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.scores.len()))?;
        for (field, score) in &self.scores {
            map.serialize_entry(field.name(), score)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelinessSummary {
    pub average_age_days: f64,
    pub oldest_record_days: i64,
    pub newest_record_days: i64,
    /// Records whose date parsed and contributed to the statistics.
    pub measured_records: usize,
    /// Records with no value in the date field.
    pub missing_records: usize,
    /// Records whose date could not be parsed.
    pub malformed_records: usize,
}

impl TimelinessSummary {
    /// False when no record carried a usable date; the zero statistics then
    /// mean "nothing measured" rather than "everything is fresh".
    pub fn is_measured(&self) -> bool {
        self.measured_records > 0
    }
}

/// Rule name -> percentage of records violating it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsistencyReport {
    violations: Vec<(String, f64)>,
}

impl ConsistencyReport {
    pub fn new(violations: Vec<(String, f64)>) -> Self {
        Self { violations }
    }

    pub fn get(&self, rule: &str) -> Option<f64> {
        self.violations
            .iter()
            .find(|(name, _)| name == rule)
            .map(|(_, rate)| *rate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.violations
            .iter()
            .map(|(name, rate)| (name.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl Serialize for ConsistencyReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.violations.len()))?;
        for (name, rate) in &self.violations {
            map.serialize_entry(name, rate)?;
        }
        map.end()
    }
}

/// A value and how many records carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCardinality {
    pub unique_values: usize,
    pub unique_ratio: f64,
    pub high_cardinality: bool,
    #[serde(serialize_with = "serialize_value_counts")]
    pub most_common: Vec<ValueCount>,
}

fn serialize_value_counts<S: Serializer>(
    counts: &[ValueCount],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(counts.len()))?;
    for entry in counts {
        map.serialize_entry(&entry.value, &entry.count)?;
    }
    map.end()
}

/// Field name -> distinct-value profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardinalityProfile {
    fields: Vec<(Field, FieldCardinality)>,
}

impl CardinalityProfile {
    pub fn new(fields: Vec<(Field, FieldCardinality)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: Field) -> Option<&FieldCardinality> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, profile)| profile)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldCardinality)> + '_ {
        self.fields.iter().map(|(f, profile)| (*f, profile))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for CardinalityProfile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, profile) in &self.fields {
            map.serialize_entry(field.name(), profile)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub completeness: FieldCompletenessScore,
    pub timeliness: TimelinessSummary,
    pub consistency: ConsistencyReport,
    pub cardinality: CardinalityProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub report_generated: DateTime<Utc>,
    pub dataset_size: usize,
    /// Set when the batch had no records and every metric is its zero value.
    pub empty_batch: bool,
    pub metrics: QualityMetrics,
}

impl QualityReport {
    pub fn to_json_pretty(&self) -> crate::utils::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
