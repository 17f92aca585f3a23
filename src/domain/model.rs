use crate::utils::error::{QualityError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Timestamp,
}

/// Known columns of the NYC 311 service request dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    UniqueKey,
    CreatedDate,
    ClosedDate,
    DueDate,
    ResolutionActionUpdatedDate,
    Agency,
    AgencyName,
    ComplaintType,
    Descriptor,
    LocationType,
    IncidentZip,
    City,
    Status,
    Borough,
    Latitude,
    Longitude,
}

impl Field {
    pub const ALL: [Field; 16] = [
        Field::UniqueKey,
        Field::CreatedDate,
        Field::ClosedDate,
        Field::DueDate,
        Field::ResolutionActionUpdatedDate,
        Field::Agency,
        Field::AgencyName,
        Field::ComplaintType,
        Field::Descriptor,
        Field::LocationType,
        Field::IncidentZip,
        Field::City,
        Field::Status,
        Field::Borough,
        Field::Latitude,
        Field::Longitude,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::UniqueKey => "unique_key",
            Field::CreatedDate => "created_date",
            Field::ClosedDate => "closed_date",
            Field::DueDate => "due_date",
            Field::ResolutionActionUpdatedDate => "resolution_action_updated_date",
            Field::Agency => "agency",
            Field::AgencyName => "agency_name",
            Field::ComplaintType => "complaint_type",
            Field::Descriptor => "descriptor",
            Field::LocationType => "location_type",
            Field::IncidentZip => "incident_zip",
            Field::City => "city",
            Field::Status => "status",
            Field::Borough => "borough",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::CreatedDate
            | Field::ClosedDate
            | Field::DueDate
            | Field::ResolutionActionUpdatedDate => FieldKind::Timestamp,
            Field::Latitude | Field::Longitude => FieldKind::Number,
            _ => FieldKind::Text,
        }
    }

    /// Resolves a column header as it appears in the API or a CSV export.
    ///
    /// CSV exports use title-cased headers ("Created Date"), so spaces and
    /// case are normalized before matching.
    pub fn from_column(column: &str) -> Option<Field> {
        let normalized = column.trim().to_ascii_lowercase().replace(' ', "_");
        Field::ALL.into_iter().find(|f| f.name() == normalized)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = QualityError;

    fn from_str(s: &str) -> Result<Self> {
        Field::from_column(s).ok_or_else(|| QualityError::UnknownField {
            name: s.to_string(),
        })
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Absent,
}

impl FieldValue {
    /// Present and non-empty. Whitespace-only text counts as present.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Absent => false,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Number(_) | FieldValue::Timestamp(_) => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Reads the value as a timestamp. Text is parsed on demand so records
    /// built outside the loaders are handled the same way.
    pub fn as_timestamp(&self, field: Field) -> Result<Option<DateTime<Utc>>> {
        match self {
            FieldValue::Timestamp(ts) => Ok(Some(*ts)),
            FieldValue::Absent => Ok(None),
            FieldValue::Text(s) if s.trim().is_empty() => Ok(None),
            FieldValue::Text(s) => parse_timestamp(field, s).map(Some),
            FieldValue::Number(n) => Err(QualityError::MalformedRecord {
                field: field.name().to_string(),
                value: n.to_string(),
                reason: "expected a timestamp, found a number".to_string(),
            }),
        }
    }

    /// Decodes a raw textual cell into the value shape of `field`.
    pub fn decode(field: Field, raw: &str) -> FieldValue {
        match field.kind() {
            FieldKind::Text => FieldValue::Text(raw.to_string()),
            FieldKind::Number => {
                if raw.trim().is_empty() {
                    return FieldValue::Absent;
                }
                raw.trim()
                    .parse::<f64>()
                    .map(FieldValue::Number)
                    .unwrap_or_else(|_| FieldValue::Text(raw.to_string()))
            }
            FieldKind::Timestamp => {
                if raw.trim().is_empty() {
                    return FieldValue::Absent;
                }
                match parse_timestamp(field, raw) {
                    Ok(ts) => FieldValue::Timestamp(ts),
                    Err(_) => FieldValue::Text(raw.to_string()),
                }
            }
        }
    }

    /// Decodes a JSON value into the value shape of `field`.
    pub fn from_json(field: Field, value: &serde_json::Value) -> FieldValue {
        match value {
            serde_json::Value::Null => FieldValue::Absent,
            serde_json::Value::String(s) => FieldValue::decode(field, s),
            serde_json::Value::Number(n) => match field.kind() {
                FieldKind::Text => FieldValue::Text(n.to_string()),
                _ => n
                    .as_f64()
                    .map(FieldValue::Number)
                    .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            },
            serde_json::Value::Bool(b) => FieldValue::Text(b.to_string()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
];

/// Parses the timestamp shapes seen in 311 feeds.
///
/// Values carrying an offset are converted to UTC. Floating timestamps (the
/// Socrata default) and date-only values are read as UTC.
pub fn parse_timestamp(field: Field, raw: &str) -> Result<DateTime<Utc>> {
    let value = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(QualityError::MalformedRecord {
        field: field.name().to_string(),
        value: raw.to_string(),
        reason: "unrecognized timestamp format".to_string(),
    })
}

static ABSENT: FieldValue = FieldValue::Absent;

/// One service request. Every known field has an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: BTreeMap<Field, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self {
            values: Field::ALL
                .into_iter()
                .map(|f| (f, FieldValue::Absent))
                .collect(),
        }
    }

    pub fn with(mut self, field: Field, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    /// Builder shorthand for text cells, decoded by field kind.
    pub fn with_raw(self, field: Field, raw: &str) -> Self {
        self.with(field, FieldValue::decode(field, raw))
    }

    pub fn set(&mut self, field: Field, value: FieldValue) {
        self.values.insert(field, value);
    }

    pub fn get(&self, field: Field) -> &FieldValue {
        self.values.get(&field).unwrap_or(&ABSENT)
    }

    /// Builds a record from a JSON object, dropping keys outside the
    /// known vocabulary.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut record = Record::new();
        for (key, value) in object {
            if let Some(field) = Field::from_column(key) {
                record.set(field, FieldValue::from_json(field, value));
            }
        }
        record
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered, immutable batch of records handed to the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    records: Vec<Record>,
}

impl RecordBatch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl From<Vec<Record>> for RecordBatch {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a RecordBatch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
