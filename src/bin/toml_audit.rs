use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use nyc311_quality::config::toml_config::{LogFormat, SourceKind, TomlConfig};
use nyc311_quality::core::summary::render_summary;
use nyc311_quality::core::{ConfigProvider, RecordSource};
use nyc311_quality::utils::{logger, validation::Validate};
use nyc311_quality::{
    AuditOutcome, AuditRunner, CsvSource, LocalStorage, QualityEngine, QualityError, ReportWriter,
    SocrataSource,
};
use std::path::Path;

#[derive(Parser)]
#[command(name = "toml-audit")]
#[command(about = "Run a 311 data quality audit described by a TOML file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "quality-audit.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be audited without fetching anything
    #[arg(long)]
    dry_run: bool,

    /// Analysis time as RFC 3339; defaults to now
    #[arg(long)]
    reference_time: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    let level = config.effective_log_level(args.verbose);
    match config.log_format() {
        LogFormat::Compact => logger::init_cli_logger(level, config.log_file())?,
        LogFormat::Json => logger::init_json_logger(level, config.log_file())?,
    }

    tracing::info!("🚀 Starting TOML-based quality audit");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let reference_time = parse_reference_time(args.reference_time.as_deref())?;

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be fetched or written");
        perform_dry_run(&config, reference_time)?;
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match config.source.r#type {
        SourceKind::Csv => {
            let source = CsvSource::new(LocalStorage::new("."), config.csv_path()?);
            run_audit(source, &config, monitor_enabled, reference_time).await
        }
        SourceKind::Socrata => {
            let source = SocrataSource::new(config.clone());
            run_audit(source, &config, monitor_enabled, reference_time).await
        }
    };

    match result {
        Ok(outcome) => {
            println!("{}", render_summary(&outcome.report));
            tracing::info!("✅ Audit '{}' completed successfully", config.audit.name);
            println!(
                "📁 Report saved to: {}",
                Path::new(config.output_path()).join(&outcome.output_path).display()
            );
        }
        Err(e) => {
            tracing::error!(
                "❌ Audit failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

async fn run_audit<R: RecordSource>(
    source: R,
    config: &TomlConfig,
    monitor_enabled: bool,
    reference_time: DateTime<Utc>,
) -> Result<AuditOutcome, QualityError> {
    let engine = QualityEngine::new(config.analysis_config()?)?;
    let writer = ReportWriter::new(
        LocalStorage::new(config.output_path()),
        &config.report.filename,
    )
    .timestamped(config.report.timestamped);

    AuditRunner::new_with_monitoring(source, engine, writer, monitor_enabled)
        .run(reference_time)
        .await
}

fn parse_reference_time(raw: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match raw {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .with_context(|| format!("invalid --reference-time '{}', expected RFC 3339", raw)),
        None => Ok(Utc::now()),
    }
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Audit: {}", config.audit.name);
    if let Some(description) = &config.audit.description {
        println!("  Description: {}", description);
    }
    match config.source.r#type {
        SourceKind::Socrata => println!("  Source: {}", config.endpoint()),
        SourceKind::Csv => println!(
            "  Source: {} (CSV)",
            config.source.path.as_deref().unwrap_or_default()
        ),
    }
    println!("  Output: {}", config.output_path());
    println!("  Max Records: {}", config.max_records());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig, reference_time: DateTime<Utc>) -> anyhow::Result<()> {
    let analysis = config
        .analysis_config()
        .context("analysis section is invalid")?;

    println!("🔍 Dry Run Analysis:");
    println!();

    println!("📡 Data Source:");
    match config.source.r#type {
        SourceKind::Socrata => {
            println!("  Endpoint: {}", config.endpoint());
            println!("  Order: {}", config.order_by());
            println!(
                "  Paging: {} records per page, {} max",
                config.page_size(),
                config.max_records()
            );
            println!("  Parameters: {} query parameters", config.query_parameters().len());
            println!(
                "  App token: {}",
                if config.app_token().is_some() { "set" } else { "not set" }
            );
            println!(
                "  Retries: {} (timeout {:?})",
                config.retry_attempts(),
                config.request_timeout()
            );
        }
        SourceKind::Csv => println!("  File: {}", config.csv_path()?),
    }

    println!();
    println!("📊 Metrics:");
    let fields: Vec<&str> = analysis.tracked_fields.iter().map(|f| f.name()).collect();
    println!("  Completeness: {}", fields.join(", "));
    println!(
        "  Timeliness: {} measured against {}",
        analysis.date_field,
        reference_time.to_rfc3339()
    );
    println!("  Consistency rules:");
    for rule in analysis.rules.iter() {
        println!("    {} - {}", rule.name(), rule.description());
    }
    let categorical: Vec<&str> = analysis
        .categorical_fields
        .iter()
        .map(|f| f.name())
        .collect();
    println!(
        "  Cardinality: {} (high above {:.1}%)",
        categorical.join(", "),
        analysis.high_cardinality_threshold
    );

    println!();
    println!("💾 Report:");
    println!("  Path: {}/{}", config.output_path(), config.report.filename);
    if config.report.timestamped {
        println!("  Filename is prefixed with the generation time");
    }

    println!();
    println!("✅ Dry run complete. Use --verbose for more details during an actual run.");

    Ok(())
}
