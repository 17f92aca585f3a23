use clap::Parser;
use nyc311_quality::core::summary::render_summary;
use nyc311_quality::core::RecordSource;
use nyc311_quality::utils::{logger, validation::Validate};
use nyc311_quality::{
    AuditOutcome, AuditRunner, CliConfig, CsvSource, LocalStorage, QualityEngine, QualityError,
    ReportWriter, SocrataSource,
};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if let Err(e) = logger::init_cli_logger(
        if config.verbose { "debug" } else { "info" },
        config.log_file.as_deref(),
    ) {
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    tracing::info!("Starting nyc311-quality audit");
    tracing::debug!("CLI config: {:?}", config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let result = match config.data_path.clone() {
        Some(data_path) => {
            let (dir, file) = split_data_path(&data_path);
            let source = CsvSource::new(LocalStorage::new(dir), file);
            run_audit(source, &config).await
        }
        None => run_audit(SocrataSource::new(config.clone()), &config).await,
    };

    match result {
        Ok(outcome) => {
            println!("{}", render_summary(&outcome.report));
            tracing::info!("✅ Audit completed successfully");
            println!(
                "📁 Report saved to: {}",
                Path::new(&config.output_path).join(&outcome.output_path).display()
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
    config: &CliConfig,
) -> Result<AuditOutcome, QualityError> {
    let engine = QualityEngine::new(config.analysis_config()?)?;
    let writer = ReportWriter::new(LocalStorage::new(&config.output_path), &config.report_file)
        .timestamped(config.timestamped);
    let runner = AuditRunner::new_with_monitoring(source, engine, writer, config.monitor);

    runner.run(config.reference_time()?).await
}

fn split_data_path(data_path: &str) -> (String, String) {
    let path = Path::new(data_path);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".".to_string());
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| data_path.to_string());
    (dir, file)
}
