pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::TomlConfig;

pub use adapters::{CsvSource, SocrataSource, NYC_311_ENDPOINT};
pub use core::audit::{AuditOutcome, AuditRunner};
pub use core::engine::{assemble, AnalysisConfig, QualityEngine};
pub use core::writer::ReportWriter;
pub use domain::model::{Field, FieldValue, Record, RecordBatch};
pub use domain::report::QualityReport;
pub use utils::error::{QualityError, Result};
