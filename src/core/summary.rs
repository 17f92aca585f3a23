use crate::domain::report::QualityReport;
use std::fmt::Write;

const TOP_COMPLETENESS: usize = 5;

/// Human-readable digest of a report for the terminal.
pub fn render_summary(report: &QualityReport) -> String {
    let metrics = &report.metrics;
    let mut out = String::new();

    let _ = writeln!(out, "=== Data Quality Summary ===");
    let _ = writeln!(out, "Generated: {}", report.report_generated.to_rfc3339());
    let _ = writeln!(out, "Dataset Size: {} records", report.dataset_size);
    if report.empty_batch {
        let _ = writeln!(out, "No records were fetched; every metric is a zero value.");
        return out;
    }

    let mut completeness: Vec<_> = metrics.completeness.iter().collect();
    completeness.sort_by(|a, b| b.1.total_cmp(&a.1));
    let _ = writeln!(out, "\nCompleteness Scores (Top {}):", TOP_COMPLETENESS);
    for (field, score) in completeness.into_iter().take(TOP_COMPLETENESS) {
        let _ = writeln!(out, "  {}: {:.1}%", field, score);
    }

    let timeliness = &metrics.timeliness;
    let _ = writeln!(out, "\nTimeliness Metrics:");
    if timeliness.is_measured() {
        let _ = writeln!(out, "  average_age_days: {:.1}", timeliness.average_age_days);
        let _ = writeln!(out, "  oldest_record_days: {}", timeliness.oldest_record_days);
        let _ = writeln!(out, "  newest_record_days: {}", timeliness.newest_record_days);
    } else {
        let _ = writeln!(out, "  no record carried a usable date");
    }
    if timeliness.missing_records > 0 || timeliness.malformed_records > 0 {
        let _ = writeln!(
            out,
            "  excluded: {} missing, {} malformed",
            timeliness.missing_records, timeliness.malformed_records
        );
    }

    let _ = writeln!(out, "\nConsistency Violations:");
    for (rule, rate) in metrics.consistency.iter() {
        let _ = writeln!(out, "  {}: {:.1}%", rule, rate);
    }

    let flagged: Vec<_> = metrics
        .cardinality
        .iter()
        .filter(|(_, profile)| profile.high_cardinality)
        .collect();
    if !flagged.is_empty() {
        let _ = writeln!(out, "\nCardinality Issues:");
        for (field, profile) in flagged {
            let _ = writeln!(
                out,
                "  High cardinality in {}: {:.1}% unique values",
                field, profile.unique_ratio
            );
        }
    }

    out
}
