use crate::adapters::NYC_311_ENDPOINT;
use crate::core::consistency::RuleSet;
use crate::core::engine::{AnalysisConfig, DEFAULT_HIGH_CARDINALITY_THRESHOLD};
use crate::core::writer::DEFAULT_REPORT_FILENAME;
use crate::core::{ConfigProvider, Field};
use crate::utils::error::{QualityError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub audit: AuditSection,
    pub source: SourceConfig,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub report: ReportConfig,
    pub monitoring: Option<MonitoringConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Socrata,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub r#type: SourceKind,
    pub endpoint: Option<String>,
    pub path: Option<String>,
    pub app_token: Option<String>,
    pub order_by: Option<String>,
    pub page_size: Option<usize>,
    pub max_records: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
    pub parameters: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    pub fields: Vec<String>,
    pub date_field: String,
    pub rules: Vec<String>,
    #[serde(default)]
    pub categorical_fields: Vec<String>,
    pub high_cardinality_threshold: Option<f64>,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let defaults = AnalysisConfig::default();
        Self {
            fields: defaults
                .tracked_fields
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            date_field: defaults.date_field.name().to_string(),
            rules: defaults.rules.names().into_iter().map(String::from).collect(),
            categorical_fields: defaults
                .categorical_fields
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            high_cardinality_threshold: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_path: String,
    pub filename: String,
    #[serde(default)]
    pub timestamped: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            filename: DEFAULT_REPORT_FILENAME.to_string(),
            timestamped: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    #[serde(default)]
    pub format: LogFormat,
    pub file: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| QualityError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SOCRATA_APP_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| QualityError::config(format!("invalid substitution pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn endpoint(&self) -> &str {
        self.source.endpoint.as_deref().unwrap_or(NYC_311_ENDPOINT)
    }

    pub fn csv_path(&self) -> Result<&str> {
        validation::validate_required_field("source.path", &self.source.path).map(String::as_str)
    }

    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let parse_all = |names: &[String]| -> Result<Vec<Field>> {
            names.iter().map(|n| n.parse::<Field>()).collect()
        };

        let config = AnalysisConfig {
            tracked_fields: parse_all(&self.analysis.fields)?,
            date_field: self.analysis.date_field.parse()?,
            rules: RuleSet::select(&self.analysis.rules)?,
            categorical_fields: parse_all(&self.analysis.categorical_fields)?,
            high_cardinality_threshold: self
                .analysis
                .high_cardinality_threshold
                .unwrap_or(DEFAULT_HIGH_CARDINALITY_THRESHOLD),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_format(&self) -> LogFormat {
        self.logging.as_ref().map(|l| l.format).unwrap_or_default()
    }

    pub fn log_file(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.file.as_deref())
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    /// `--verbose` forces debug; otherwise the configured level, then info.
    pub fn effective_log_level(&self, verbose: bool) -> &str {
        if verbose {
            "debug"
        } else {
            self.log_level().unwrap_or("info")
        }
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("audit.name", &self.audit.name)?;

        match self.source.r#type {
            SourceKind::Socrata => validation::validate_url("source.endpoint", self.endpoint())?,
            SourceKind::Csv => {
                let path = self.csv_path()?;
                validation::validate_path("source.path", path)?;
                validation::validate_file_extension("source.path", path, &["csv"])?;
            }
        }

        if let Some(page_size) = self.source.page_size {
            validation::validate_range("source.page_size", page_size, 1, 50_000)?;
        }
        if let Some(max_records) = self.source.max_records {
            validation::validate_positive_number("source.max_records", max_records, 1)?;
        }
        if let Some(retries) = self.source.retry_attempts {
            validation::validate_range("source.retry_attempts", retries, 0, 10)?;
        }

        validation::validate_path("report.output_path", &self.report.output_path)?;
        validation::validate_non_empty_string("report.filename", &self.report.filename)?;

        if let Some(level) = self.log_level() {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(QualityError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        self.analysis_config()?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_endpoint(&self) -> &str {
        self.endpoint()
    }

    fn output_path(&self) -> &str {
        &self.report.output_path
    }

    fn max_records(&self) -> usize {
        self.source.max_records.unwrap_or(1000)
    }

    fn page_size(&self) -> usize {
        self.source.page_size.unwrap_or(1000)
    }

    fn order_by(&self) -> &str {
        self.source.order_by.as_deref().unwrap_or("created_date DESC")
    }

    fn app_token(&self) -> Option<&str> {
        self.source
            .app_token
            .as_deref()
            .filter(|token| !token.is_empty() && !token.starts_with("${"))
    }

    fn query_parameters(&self) -> Vec<(String, String)> {
        self.source
            .parameters
            .as_ref()
            .map(|params| params.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds.unwrap_or(30))
    }

    fn retry_attempts(&self) -> u32 {
        self.source.retry_attempts.unwrap_or(2)
    }

    fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.source.retry_delay_seconds.unwrap_or(1))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[audit]
name = "nightly-311"

[source]
type = "socrata"
page_size = 500
max_records = 2000

[source.parameters]
"$where" = "created_date > '2024-01-01'"

[analysis]
fields = ["created_date", "complaint_type", "borough"]
date_field = "created_date"
rules = ["known-borough"]

[report]
output_path = "./reports"
filename = "quality.json"
timestamped = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.audit.name, "nightly-311");
        assert_eq!(config.api_endpoint(), NYC_311_ENDPOINT);
        assert_eq!(config.page_size(), 500);
        assert_eq!(config.max_records(), 2000);
        assert_eq!(
            config.query_parameters(),
            vec![("$where".to_string(), "created_date > '2024-01-01'".to_string())]
        );
        assert!(config.report.timestamped);
        assert!(config.validate().is_ok());

        let analysis = config.analysis_config().unwrap();
        assert_eq!(analysis.tracked_fields.len(), 3);
        assert_eq!(analysis.rules.names(), vec!["known-borough"]);
        assert!(analysis.categorical_fields.is_empty());
    }

    #[test]
    fn test_analysis_and_report_default() {
        let toml_content = r#"
[audit]
name = "defaults"

[source]
type = "socrata"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.report.filename, DEFAULT_REPORT_FILENAME);
        assert_eq!(config.analysis_config().unwrap().rules.len(), 3);
        assert_eq!(config.log_format(), LogFormat::Compact);
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_311_ENDPOINT", "https://test.api.com/resource/x.json");

        let toml_content = r#"
[audit]
name = "env"

[source]
type = "socrata"
endpoint = "${TEST_311_ENDPOINT}"
app_token = "${TEST_311_TOKEN_THAT_IS_NOT_SET}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.api_endpoint(), "https://test.api.com/resource/x.json");
        assert_eq!(config.app_token(), None);

        std::env::remove_var("TEST_311_ENDPOINT");
    }

    #[test]
    fn test_unknown_field_fails_validation() {
        let toml_content = r#"
[audit]
name = "bad-field"

[source]
type = "socrata"

[analysis]
fields = ["created_date", "complaint_typo"]
date_field = "created_date"
rules = []
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(QualityError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_csv_source_requires_path() {
        let toml_content = r#"
[audit]
name = "csv"

[source]
type = "csv"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(QualityError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_invalid_log_level() {
        let toml_content = r#"
[audit]
name = "logs"

[source]
type = "socrata"

[logging]
level = "chatty"
format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.log_format(), LogFormat::Json);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_applies_to_compact_format() {
        let toml_content = r#"
[audit]
name = "quiet"

[source]
type = "socrata"

[logging]
level = "warn"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.log_format(), LogFormat::Compact);
        assert_eq!(config.effective_log_level(false), "warn");
        assert_eq!(config.effective_log_level(true), "debug");

        let unset = TomlConfig::from_toml_str("[audit]\nname = \"x\"\n[source]\ntype = \"csv\"\n").unwrap();
        assert_eq!(unset.effective_log_level(false), "info");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[audit]
name = "file-test"

[source]
type = "csv"
path = "./data/311.csv"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.audit.name, "file-test");
        assert_eq!(config.csv_path().unwrap(), "./data/311.csv");
        assert!(config.validate().is_ok());
    }
}
