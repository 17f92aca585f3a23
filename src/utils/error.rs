use thiserror::Error;

#[derive(Error, Debug)]
pub enum QualityError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {endpoint}")]
    HttpStatusError { status: u16, endpoint: String },

    #[error("Unexpected API payload: {message}")]
    PayloadError { message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown field '{name}'")]
    UnknownField { name: String },

    #[error("Unknown consistency rule '{name}'")]
    UnknownRule { name: String },

    #[error("Malformed value in '{field}': {value:?} ({reason})")]
    MalformedRecord {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl QualityError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorCategory::Network,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownField { .. }
            | Self::UnknownRule { .. } => ErrorCategory::Configuration,
            Self::PayloadError { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::MalformedRecord { .. } => ErrorCategory::Data,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::MalformedRecord { .. } => ErrorSeverity::Low,
            Self::ApiError(_) => ErrorSeverity::Medium,
            Self::HttpStatusError { status, .. } if *status == 429 || *status >= 500 => {
                ErrorSeverity::Medium
            }
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Whether the loader should try the same request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::HttpStatusError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ApiError(_) => "Check network connectivity and the API endpoint, then retry",
            Self::HttpStatusError { status, .. } if *status == 429 => {
                "The API is rate limiting requests; configure an app token or lower the page size"
            }
            Self::HttpStatusError { .. } => "Verify the endpoint URL and query parameters",
            Self::PayloadError { .. } => "Make sure the endpoint returns a JSON array of objects",
            Self::CsvError(_) => "Check that the CSV file has a header row and consistent columns",
            Self::IoError(_) => "Check file permissions and available disk space",
            Self::SerializationError(_) => "Report this issue; the report could not be encoded",
            Self::UnknownField { .. } => "Use one of the known 311 column names, e.g. created_date",
            Self::UnknownRule { .. } => {
                "Use closed-before-created, status-closure-agreement, known-borough or due-before-created"
            }
            Self::MalformedRecord { .. } => "The record is excluded from the affected statistic",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the configuration value and run again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not fetch service requests: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not read the dataset: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code for binaries, derived from severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, QualityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_retryable() {
        let err = QualityError::HttpStatusError {
            status: 429,
            endpoint: "https://example.com".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Network);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_client_error_is_not_retryable() {
        let err = QualityError::HttpStatusError {
            status: 404,
            endpoint: "https://example.com".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_unknown_field_is_configuration() {
        let err = QualityError::UnknownField {
            name: "colour".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(err.user_friendly_message().contains("colour"));
    }
}
