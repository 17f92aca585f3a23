//! Consistency analysis: named cross-field rules evaluated per record.
//!
//! A rule only judges records that carry every field it depends on. A missing
//! value is a completeness finding and is never reported here as well.

use crate::core::scoring::percentage;
use crate::domain::model::{Field, Record, RecordBatch};
use crate::domain::report::ConsistencyReport;
use crate::utils::error::{QualityError, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

pub const CLOSED_BEFORE_CREATED: &str = "closed-before-created";
pub const STATUS_CLOSURE_AGREEMENT: &str = "status-closure-agreement";
pub const KNOWN_BOROUGH: &str = "known-borough";
pub const DUE_BEFORE_CREATED: &str = "due-before-created";

const CLOSED_STATUS: &str = "Closed";

/// Borough values accepted by `known-borough`. Matching ignores case and
/// surrounding whitespace.
pub const VALID_BOROUGHS: [&str; 6] = [
    "MANHATTAN",
    "BROOKLYN",
    "QUEENS",
    "BRONX",
    "STATEN ISLAND",
    "Unspecified",
];

type Predicate = dyn Fn(&Record) -> bool + Send + Sync;

/// A named predicate over one record; `true` means consistent.
#[derive(Clone)]
pub struct Rule {
    name: String,
    description: String,
    predicate: Arc<Predicate>,
}

impl Rule {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_consistent(&self, record: &Record) -> bool {
        (self.predicate)(record)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Timestamp of `field`, or None when absent or unreadable. Unreadable
/// values are skipped by the date rules and logged here.
fn readable_timestamp(record: &Record, field: Field) -> Option<DateTime<Utc>> {
    match record.get(field).as_timestamp(field) {
        Ok(ts) => ts,
        Err(e) => {
            tracing::debug!(
                unique_key = record.get(Field::UniqueKey).as_text().unwrap_or("?"),
                "date rule skipped: {}",
                e
            );
            None
        }
    }
}

/// Both dates parse and `later` falls before `earlier`.
fn dates_out_of_order(record: &Record, earlier: Field, later: Field) -> bool {
    let earlier_ts = readable_timestamp(record, earlier);
    let later_ts = readable_timestamp(record, later);
    matches!((earlier_ts, later_ts), (Some(e), Some(l)) if l < e)
}

pub fn closed_before_created() -> Rule {
    Rule::new(
        CLOSED_BEFORE_CREATED,
        "closed_date must not precede created_date",
        |record| !dates_out_of_order(record, Field::CreatedDate, Field::ClosedDate),
    )
}

pub fn due_before_created() -> Rule {
    Rule::new(
        DUE_BEFORE_CREATED,
        "due_date must not precede created_date",
        |record| !dates_out_of_order(record, Field::CreatedDate, Field::DueDate),
    )
}

pub fn status_closure_agreement() -> Rule {
    Rule::new(
        STATUS_CLOSURE_AGREEMENT,
        "status is Closed exactly when closed_date is set",
        |record| {
            let status = record.get(Field::Status);
            if !status.is_present() {
                return true;
            }
            let is_closed = status.as_text() == Some(CLOSED_STATUS);
            let has_closed_date = record.get(Field::ClosedDate).is_present();
            is_closed == has_closed_date
        },
    )
}

pub fn is_known_borough(value: &str) -> bool {
    let value = value.trim();
    VALID_BOROUGHS
        .iter()
        .any(|borough| borough.eq_ignore_ascii_case(value))
}

pub fn known_borough() -> Rule {
    Rule::new(
        KNOWN_BOROUGH,
        "borough is one of the five boroughs or Unspecified",
        |record| {
            let borough = record.get(Field::Borough);
            if !borough.is_present() {
                return true;
            }
            borough.as_text().is_some_and(is_known_borough)
        },
    )
}

/// Ordered collection of uniquely named rules.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in rule.
    pub fn builtin() -> Self {
        Self {
            rules: vec![
                closed_before_created(),
                status_closure_agreement(),
                known_borough(),
                due_before_created(),
            ],
        }
    }

    /// The rules every report carries unless configured otherwise.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                closed_before_created(),
                status_closure_agreement(),
                known_borough(),
            ],
        }
    }

    /// Picks built-in rules by name, in the order given.
    pub fn select<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let builtin = Self::builtin();
        let mut selected = Self::new();
        for name in names {
            let name = name.as_ref();
            let rule = builtin
                .get(name)
                .cloned()
                .ok_or_else(|| QualityError::UnknownRule {
                    name: name.to_string(),
                })?;
            selected.register(rule)?;
        }
        Ok(selected)
    }

    pub fn register(&mut self, rule: Rule) -> Result<()> {
        if self.get(rule.name()).is_some() {
            return Err(QualityError::ConfigValidationError {
                field: "analysis.rules".to_string(),
                message: format!("rule '{}' is registered more than once", rule.name()),
            });
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(Rule::name).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Violation rate of every rule over `batch`. An empty batch reports 0.0
/// for each rule.
pub fn check(batch: &RecordBatch, rules: &RuleSet) -> Result<ConsistencyReport> {
    let total = batch.len();
    let violations = rules
        .iter()
        .map(|rule| {
            let violated = batch
                .iter()
                .filter(|record| !rule.is_consistent(record))
                .count();
            if violated > 0 {
                tracing::debug!("rule {}: {}/{} violations", rule.name(), violated, total);
            }
            (rule.name().to_string(), percentage(violated, total))
        })
        .collect();

    Ok(ConsistencyReport::new(violations))
}
