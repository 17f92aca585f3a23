pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::adapters::NYC_311_ENDPOINT;
#[cfg(feature = "cli")]
use crate::core::consistency::RuleSet;
#[cfg(feature = "cli")]
use crate::core::engine::{AnalysisConfig, DEFAULT_HIGH_CARDINALITY_THRESHOLD};
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::{QualityError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use chrono::{DateTime, Utc};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "nyc311-quality")]
#[command(about = "Audit the NYC 311 service request feed for data quality")]
pub struct CliConfig {
    #[arg(long, default_value = NYC_311_ENDPOINT)]
    pub api_endpoint: String,

    /// Read records from a local CSV export instead of the API
    #[arg(long)]
    pub data_path: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = crate::core::writer::DEFAULT_REPORT_FILENAME)]
    pub report_file: String,

    /// Prefix the report filename with its generation time
    #[arg(long)]
    pub timestamped: bool,

    /// Maximum number of records to fetch
    #[arg(long, default_value = "1000")]
    pub limit: usize,

    #[arg(long, default_value = "1000")]
    pub page_size: usize,

    #[arg(long, env = "SOCRATA_APP_TOKEN")]
    pub app_token: Option<String>,

    /// Socrata `$where` clause, e.g. "borough='BROOKLYN'"
    #[arg(long = "where")]
    pub where_clause: Option<String>,

    /// Analysis time as RFC 3339; defaults to now
    #[arg(long)]
    pub reference_time: Option<String>,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "created_date,complaint_type,closed_date,status,borough"
    )]
    pub fields: Vec<String>,

    #[arg(long, default_value = "created_date")]
    pub date_field: String,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "closed-before-created,status-closure-agreement,known-borough"
    )]
    pub rules: Vec<String>,

    #[arg(long, value_delimiter = ',', default_value = "complaint_type,status,borough")]
    pub categorical_fields: Vec<String>,

    #[arg(long, default_value_t = DEFAULT_HIGH_CARDINALITY_THRESHOLD)]
    pub high_cardinality_threshold: f64,

    /// Also write logs to this file
    #[arg(long)]
    pub log_file: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let config = AnalysisConfig {
            tracked_fields: parse_fields(&self.fields)?,
            date_field: self.date_field.parse()?,
            rules: RuleSet::select(&self.rules)?,
            categorical_fields: parse_fields(&self.categorical_fields)?,
            high_cardinality_threshold: self.high_cardinality_threshold,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn reference_time(&self) -> Result<DateTime<Utc>> {
        match &self.reference_time {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| QualityError::InvalidConfigValueError {
                    field: "reference_time".to_string(),
                    value: raw.clone(),
                    reason: format!("expected RFC 3339: {}", e),
                }),
            None => Ok(Utc::now()),
        }
    }
}

#[cfg(feature = "cli")]
fn parse_fields(names: &[String]) -> Result<Vec<crate::core::Field>> {
    names.iter().map(|name| name.parse()).collect()
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn max_records(&self) -> usize {
        self.limit
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn app_token(&self) -> Option<&str> {
        self.app_token.as_deref()
    }

    fn query_parameters(&self) -> Vec<(String, String)> {
        self.where_clause
            .iter()
            .map(|clause| ("$where".to_string(), clause.clone()))
            .collect()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.data_path {
            Some(path) => {
                validation::validate_path("data_path", path)?;
                validation::validate_file_extension("data_path", path, &["csv"])?;
            }
            None => validation::validate_url("api_endpoint", &self.api_endpoint)?,
        }
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_non_empty_string("report_file", &self.report_file)?;
        validation::validate_positive_number("limit", self.limit, 1)?;
        validation::validate_range("page_size", self.page_size, 1, 50_000)?;
        self.reference_time()?;
        self.analysis_config()?;
        Ok(())
    }
}
