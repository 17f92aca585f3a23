use crate::core::Storage;
use crate::domain::report::QualityReport;
use crate::utils::error::Result;

pub const DEFAULT_REPORT_FILENAME: &str = "data_quality_report.json";

/// Serializes reports as JSON through a `Storage` backend.
pub struct ReportWriter<S: Storage> {
    storage: S,
    filename: String,
    timestamped: bool,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S, filename: impl Into<String>) -> Self {
        Self {
            storage,
            filename: filename.into(),
            timestamped: false,
        }
    }

    /// Prefix filenames with the report timestamp so earlier reports are kept.
    pub fn timestamped(mut self, enabled: bool) -> Self {
        self.timestamped = enabled;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn filename_for(&self, report: &QualityReport) -> String {
        if self.timestamped {
            format!(
                "{}_{}",
                report.report_generated.format("%Y%m%dT%H%M%SZ"),
                self.filename
            )
        } else {
            self.filename.clone()
        }
    }

    /// Writes `report` and returns the filename it was stored under.
    pub async fn write(&self, report: &QualityReport) -> Result<String> {
        let filename = self.filename_for(report);
        let json = report.to_json_pretty()?;

        tracing::debug!("Writing report ({} bytes) to {}", json.len(), filename);
        self.storage.write_file(&filename, json.as_bytes()).await?;

        Ok(filename)
    }
}
