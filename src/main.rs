use clap::Parser;
use mastery_export::core::extractor::MASTERY_PATH;
use mastery_export::core::roster::ROSTER_PATH;
use mastery_export::utils::error::ErrorSeverity;
use mastery_export::utils::{logger, validation::Validate};
use mastery_export::{
    ChromeOptions, ChromeSession, CliConfig, Collaborators, ConfigStore, ExportEngine,
    LocalStorage, RunOutcome, SystemClock,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting mastery-export");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let chrome = match ChromeSession::launch(ChromeOptions {
        chrome_path: config.chrome_path.clone().map(Into::into),
        watched_paths: vec![ROSTER_PATH.to_string(), MASTERY_PATH.to_string()],
    }) {
        Ok(chrome) => Arc::new(chrome),
        Err(e) => {
            tracing::error!("❌ Could not start the browser: {}", e);
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let collaborators = Collaborators {
        session: chrome.clone(),
        status: chrome.clone(),
        prompt: chrome.clone(),
        clock: Arc::new(SystemClock),
    };
    let config_store = ConfigStore::new(LocalStorage::new(config.config_dir.clone()));
    let output = LocalStorage::new(config.output_dir.clone());

    let engine = ExportEngine::new(collaborators, config_store, output, config);

    match engine.run().await {
        Ok(RunOutcome::Saved {
            path,
            classes,
            students,
        }) => {
            tracing::info!("✅ Export completed: {} class(es), {} student(s)", classes, students);
            println!("✅ Export completed successfully!");
            println!("📁 Output saved to: {}", path);
        }
        Ok(RunOutcome::NothingSelected) => {
            println!("No classes selected, nothing exported.");
        }
        Err(e) => {
            tracing::error!("❌ Export failed: {} (Severity: {:?})", e, e.severity());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
