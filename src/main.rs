use anyhow::Context;
use clap::Parser;
use std::path::Path;
use ticket_triage::utils::error::ErrorSeverity;
use ticket_triage::utils::{logger, validation::Validate};
use ticket_triage::{api, AppState, CliArgs, TriageConfig, TriageError};

const DEFAULT_CONFIG_FILE: &str = "triage.toml";

fn load_config(args: &CliArgs) -> ticket_triage::Result<TriageConfig> {
    let mut config = match &args.config {
        Some(path) => TriageConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            TriageConfig::from_file(DEFAULT_CONFIG_FILE)?
        }
        None => TriageConfig::from_env(),
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    Ok(config)
}

fn exit_with(e: &TriageError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_logger(&config.logging.level, config.logging.format, args.verbose);
    tracing::info!("🚀 Starting ticket-triage");
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        exit_with(&e);
    }

    if args.check {
        let mut check_config = config.clone();
        check_config.model.preload = true;
        let state = match AppState::from_config(&check_config).await {
            Ok(state) => state,
            Err(e) => exit_with(&e),
        };
        let labels = state
            .flow
            .classifier()
            .label_set()
            .await
            .context("model loaded but label set unavailable")?;
        println!("✅ Configuration valid, model loaded");
        println!("🏷️  Departments: {}", labels.join(", "));
        return Ok(());
    }

    let state = match AppState::from_config(&config).await {
        Ok(state) => state,
        Err(e) => exit_with(&e),
    };

    let app = api::router(state).layer(api::cors_layer(&config.server.cors_origins));

    if let Err(e) = api::serve(&config.bind_address(), app).await {
        exit_with(&e);
    }

    Ok(())
}
