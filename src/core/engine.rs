//! Quality engine facade.
//!
//! `QualityEngine` holds a validated analysis configuration and turns a
//! record batch plus a reference time into a complete `QualityReport`.
//! It keeps no state between calls.

use crate::core::completeness::ensure_distinct_fields;
use crate::core::consistency::RuleSet;
use crate::core::{cardinality, completeness, consistency, timeliness};
use crate::domain::model::{Field, FieldKind, RecordBatch};
use crate::domain::report::{QualityMetrics, QualityReport};
use crate::utils::error::{QualityError, Result};
use chrono::{DateTime, Utc};

pub const DEFAULT_HIGH_CARDINALITY_THRESHOLD: f64 = 80.0;

/// What the engine measures.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub tracked_fields: Vec<Field>,
    pub date_field: Field,
    pub rules: RuleSet,
    pub categorical_fields: Vec<Field>,
    pub high_cardinality_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tracked_fields: vec![
                Field::CreatedDate,
                Field::ComplaintType,
                Field::ClosedDate,
                Field::Status,
                Field::Borough,
            ],
            date_field: Field::CreatedDate,
            rules: RuleSet::standard(),
            categorical_fields: vec![Field::ComplaintType, Field::Status, Field::Borough],
            high_cardinality_threshold: DEFAULT_HIGH_CARDINALITY_THRESHOLD,
        }
    }
}

impl AnalysisConfig {
    /// Builds a configuration from names, failing on anything unknown.
    pub fn from_names<S: AsRef<str>>(
        fields: &[S],
        date_field: &str,
        rules: &[S],
        categorical_fields: &[S],
    ) -> Result<Self> {
        let parse_all = |names: &[S]| -> Result<Vec<Field>> {
            names.iter().map(|n| n.as_ref().parse::<Field>()).collect()
        };

        let config = Self {
            tracked_fields: parse_all(fields)?,
            date_field: date_field.parse()?,
            rules: RuleSet::select(rules)?,
            categorical_fields: parse_all(categorical_fields)?,
            high_cardinality_threshold: DEFAULT_HIGH_CARDINALITY_THRESHOLD,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_distinct_fields(&self.tracked_fields)?;

        if self.date_field.kind() != FieldKind::Timestamp {
            return Err(QualityError::InvalidConfigValueError {
                field: "analysis.date_field".to_string(),
                value: self.date_field.name().to_string(),
                reason: "timeliness needs a timestamp field".to_string(),
            });
        }

        if !self.categorical_fields.is_empty() {
            ensure_distinct_fields(&self.categorical_fields)?;
        }

        crate::utils::validation::validate_range(
            "analysis.high_cardinality_threshold",
            self.high_cardinality_threshold,
            0.0,
            100.0,
        )?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct QualityEngine {
    config: AnalysisConfig,
}

impl QualityEngine {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: AnalysisConfig::default(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Runs every analyzer over `batch` and assembles the report.
    ///
    /// Any analyzer error aborts the whole assembly; a report is either
    /// complete or not produced.
    pub fn assemble(
        &self,
        batch: &RecordBatch,
        reference_time: DateTime<Utc>,
    ) -> Result<QualityReport> {
        let config = &self.config;

        tracing::info!(
            "Analyzing {} records against {}",
            batch.len(),
            reference_time.to_rfc3339()
        );
        if batch.is_empty() {
            tracing::warn!("Empty batch: every metric will report its zero value");
        }

        let completeness = completeness::score(batch, &config.tracked_fields)?;
        let timeliness = timeliness::summarize(batch, config.date_field, reference_time)?;
        let consistency = consistency::check(batch, &config.rules)?;
        let cardinality = cardinality::profile(
            batch,
            &config.categorical_fields,
            config.high_cardinality_threshold,
        )?;

        Ok(QualityReport {
            report_generated: reference_time,
            dataset_size: batch.len(),
            empty_batch: batch.is_empty(),
            metrics: QualityMetrics {
                completeness,
                timeliness,
                consistency,
                cardinality,
            },
        })
    }
}

/// Assembles a report with the default analysis configuration.
pub fn assemble(batch: &RecordBatch, reference_time: DateTime<Utc>) -> Result<QualityReport> {
    QualityEngine::with_defaults().assemble(batch, reference_time)
}
