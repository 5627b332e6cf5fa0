//! exercise-sync binary entry point

use std::process::ExitCode;

use clap::Parser;
use exercise_sync::{SyncApp, cli::Cli, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status used when the run is interrupted with Ctrl+C
const INTERRUPTED: u8 = 130;

fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("exercise_sync={}", logging.level).into());

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Application entry point
///
/// # Setup
/// 1. Parse arguments and load configuration
/// 2. Initialize tracing/logging and metrics
/// 3. Open the database and build the catalog client, racing Ctrl+C
/// 4. Run the command, racing it against Ctrl+C
/// 5. Close the database and flush metrics, whatever happened in 4
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Arguments and configuration
    let cli = Cli::parse();
    let config = match config::AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("exercise-sync: {error}");
            return ExitCode::FAILURE;
        }
    };

    // 2. Logging and metrics
    init_tracing(&config.logging);
    exercise_sync::metrics::init_metrics();
    tracing::info!(
        catalog = %config.catalog.base_url,
        database = %config.database.file_path().display(),
        "Configuration loaded"
    );

    // One handler for the whole run, so an interrupt during startup is caught too
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let metrics_path = config.metrics.textfile_path.clone();

    // 3. Application state
    let app = tokio::select! {
        result = SyncApp::new(config) => match result {
            Ok(app) => app,
            Err(error) => {
                tracing::error!(%error, "Failed to initialize");
                return ExitCode::FAILURE;
            }
        },
        _ = &mut interrupt => {
            tracing::info!("Operation interrupted by user during startup");
            flush_metrics(metrics_path.as_deref());
            return ExitCode::from(INTERRUPTED);
        }
    };

    // 4. Run the command
    let command = cli.command();
    let outcome = tokio::select! {
        result = app.run_command(&command) => Some(result),
        _ = &mut interrupt => None,
    };

    let code = match outcome {
        Some(Ok(text)) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Some(Err(error)) => {
            tracing::error!(%error, ?command, "Command failed");
            ExitCode::FAILURE
        }
        None => {
            tracing::info!("Operation interrupted by user");
            ExitCode::from(INTERRUPTED)
        }
    };

    // 5. Cleanup
    app.shutdown().await;

    code
}

/// Write metrics when startup never produced an app to shut down
fn flush_metrics(path: Option<&std::path::Path>) {
    if let Some(path) = path {
        if let Err(error) = exercise_sync::metrics::write_textfile(path) {
            tracing::error!(%error, "Failed to write metrics");
        }
    }
}
