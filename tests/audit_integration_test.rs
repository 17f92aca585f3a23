use chrono::{TimeZone, Utc};
use clap::Parser;
use httpmock::prelude::*;
use nyc311_quality::core::ConfigProvider;
use nyc311_quality::{
    AuditRunner, CliConfig, CsvSource, LocalStorage, QualityEngine, ReportWriter, SocrataSource,
};
use tempfile::TempDir;

fn sample_requests() -> serde_json::Value {
    serde_json::json!([
        {
            "unique_key": "59893919",
            "created_date": "2024-03-10T12:00:00.000",
            "closed_date": "2024-03-12T08:30:00.000",
            "agency": "NYPD",
            "complaint_type": "Noise - Residential",
            "status": "Closed",
            "borough": "BROOKLYN"
        },
        {
            "unique_key": "59893920",
            "created_date": "2024-03-18T12:00:00.000",
            "agency": "NYPD",
            "complaint_type": "Noise - Residential",
            "status": "Closed",
            "borough": "queens "
        },
        {
            "unique_key": "59893921",
            "created_date": "2024-03-19T12:00:00.000",
            "agency": "DSNY",
            "complaint_type": "",
            "status": "Open",
            "borough": "Atlantis"
        }
    ])
}

fn cli_config(endpoint: &str, output_path: &str) -> CliConfig {
    CliConfig::parse_from([
        "nyc311-quality",
        "--api-endpoint",
        endpoint,
        "--output-path",
        output_path,
        "--reference-time",
        "2024-03-20T12:00:00Z",
    ])
}

#[tokio::test]
async fn test_end_to_end_audit_against_mock_api() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET)
            .path("/resource/erm2-nwe9.json")
            .query_param("$limit", "1000")
            .query_param("$offset", "0");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(sample_requests());
    });

    let config = cli_config(&server.url("/resource/erm2-nwe9.json"), &output_path);
    let engine = QualityEngine::new(config.analysis_config().unwrap()).unwrap();
    let writer = ReportWriter::new(LocalStorage::new(config.output_path()), &config.report_file);
    let reference_time = config.reference_time().unwrap();
    let runner = AuditRunner::new(SocrataSource::new(config), engine, writer);

    let outcome = runner.run(reference_time).await.unwrap();

    api_mock.assert();
    assert!(outcome.output_path.ends_with("data_quality_report.json"));

    let written = std::fs::read_to_string(
        temp_dir.path().join("data_quality_report.json"),
    )
    .unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();

    assert_eq!(json["dataset_size"], 3);
    assert_eq!(json["empty_batch"], false);
    assert_eq!(json["report_generated"], "2024-03-20T12:00:00Z");

    let metrics = &json["metrics"];
    assert_eq!(metrics["completeness"]["created_date"], 100.0);
    assert_eq!(metrics["completeness"]["complaint_type"], 66.7);
    assert_eq!(metrics["completeness"]["closed_date"], 33.3);
    assert_eq!(metrics["completeness"]["status"], 100.0);
    assert_eq!(metrics["completeness"]["borough"], 100.0);

    assert_eq!(metrics["timeliness"]["average_age_days"], 4.3);
    assert_eq!(metrics["timeliness"]["oldest_record_days"], 10);
    assert_eq!(metrics["timeliness"]["newest_record_days"], 1);
    assert_eq!(metrics["timeliness"]["measured_records"], 3);

    assert_eq!(metrics["consistency"]["closed-before-created"], 0.0);
    assert_eq!(metrics["consistency"]["status-closure-agreement"], 33.3);
    assert_eq!(metrics["consistency"]["known-borough"], 33.3);

    assert_eq!(metrics["cardinality"]["status"]["unique_values"], 2);
    assert_eq!(metrics["cardinality"]["borough"]["high_cardinality"], true);
    assert_eq!(
        metrics["cardinality"]["complaint_type"]["most_common"]["Noise - Residential"],
        2
    );

    // Completeness keys keep the configured field order.
    let keys: Vec<&String> = metrics["completeness"].as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 5);
    assert_eq!(outcome.report.metrics.completeness.len(), 5);
}

#[tokio::test]
async fn test_failed_fetch_writes_no_report() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().join("reports");

    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path("/resource/erm2-nwe9.json");
        then.status(403).body("forbidden");
    });

    let config = cli_config(
        &server.url("/resource/erm2-nwe9.json"),
        output_path.to_str().unwrap(),
    );
    let engine = QualityEngine::new(config.analysis_config().unwrap()).unwrap();
    let writer = ReportWriter::new(LocalStorage::new(&output_path), "data_quality_report.json");
    let runner = AuditRunner::new(SocrataSource::new(config), engine, writer);

    let result = runner
        .run(Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap())
        .await;

    api_mock.assert();
    let err = result.unwrap_err();
    assert!(matches!(
        err,
        nyc311_quality::QualityError::HttpStatusError { status: 403, .. }
    ));
    assert!(!output_path.join("data_quality_report.json").exists());
}

#[tokio::test]
async fn test_empty_api_response_produces_empty_report() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/resource/erm2-nwe9.json");
        then.status(200).json_body(serde_json::json!([]));
    });

    let config = cli_config(&server.url("/resource/erm2-nwe9.json"), &output_path);
    let engine = QualityEngine::new(config.analysis_config().unwrap()).unwrap();
    let writer = ReportWriter::new(LocalStorage::new(&output_path), "empty.json");
    let runner = AuditRunner::new(SocrataSource::new(config), engine, writer);

    let outcome = runner
        .run(Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap())
        .await
        .unwrap();

    assert!(outcome.report.empty_batch);
    assert_eq!(outcome.report.dataset_size, 0);
    assert!(outcome
        .report
        .metrics
        .completeness
        .iter()
        .all(|(_, score)| score == 0.0));
    assert!(!outcome.report.metrics.timeliness.is_measured());
    assert!(temp_dir.path().join("empty.json").exists());
}

#[tokio::test]
async fn test_end_to_end_audit_from_csv_export() {
    let temp_dir = TempDir::new().unwrap();
    let csv = "\
Unique Key,Created Date,Closed Date,Agency,Complaint Type,Status,Borough
1,03/10/2024 12:00:00 PM,03/12/2024 08:30:00 AM,NYPD,Noise - Residential,Closed,BROOKLYN
2,03/18/2024 12:00:00 PM,,NYPD,Illegal Parking,Closed,QUEENS
";
    std::fs::write(temp_dir.path().join("311.csv"), csv).unwrap();

    let source = CsvSource::new(LocalStorage::new(temp_dir.path()), "311.csv");
    let writer = ReportWriter::new(
        LocalStorage::new(temp_dir.path().join("out")),
        "report.json",
    )
    .timestamped(true);
    let runner = AuditRunner::new(source, QualityEngine::with_defaults(), writer);

    let outcome = runner
        .run(Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap())
        .await
        .unwrap();

    let report = &outcome.report;
    assert_eq!(report.dataset_size, 2);
    assert_eq!(report.metrics.timeliness.average_age_days, 6.0);
    assert_eq!(report.metrics.timeliness.oldest_record_days, 10);
    assert_eq!(report.metrics.timeliness.newest_record_days, 2);
    assert_eq!(
        report.metrics.consistency.get("status-closure-agreement"),
        Some(50.0)
    );
    assert_eq!(report.metrics.completeness.get(nyc311_quality::Field::ClosedDate), Some(50.0));

    assert!(outcome.output_path.ends_with("20240320T120000Z_report.json"));
    assert!(temp_dir
        .path()
        .join("out")
        .join("20240320T120000Z_report.json")
        .exists());
}
