use crate::core::engine::QualityEngine;
use crate::core::writer::ReportWriter;
use crate::core::{RecordSource, Storage};
use crate::domain::report::QualityReport;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};

/// Outcome of a completed audit.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub report: QualityReport,
    /// Report filename, relative to the writer's storage root.
    pub output_path: String,
}

/// Drives one audit: fetch the batch, assemble the report, write it.
pub struct AuditRunner<R: RecordSource, S: Storage> {
    source: R,
    engine: QualityEngine,
    writer: ReportWriter<S>,
    monitor: SystemMonitor,
}

impl<R: RecordSource, S: Storage> AuditRunner<R, S> {
    pub fn new(source: R, engine: QualityEngine, writer: ReportWriter<S>) -> Self {
        Self::new_with_monitoring(source, engine, writer, false)
    }

    pub fn new_with_monitoring(
        source: R,
        engine: QualityEngine,
        writer: ReportWriter<S>,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            source,
            engine,
            writer,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Runs the audit against an explicit reference time.
    ///
    /// Nothing is written unless the fetch and the assembly both succeed.
    pub async fn run(&self, reference_time: DateTime<Utc>) -> Result<AuditOutcome> {
        tracing::info!("Fetching records from {}", self.source.describe());
        self.monitor.log_stats("Before fetch");
        let batch = self.source.fetch().await?;
        tracing::info!("Fetched {} records", batch.len());
        self.monitor.log_stats("After fetch");

        let report = self.engine.assemble(&batch, reference_time)?;
        self.monitor.log_stats("After analysis");

        let output_path = self.writer.write(&report).await?;
        tracing::info!("Report saved to {}", output_path);
        self.monitor.log_final_stats();

        Ok(AuditOutcome {
            report,
            output_path,
        })
    }
}
