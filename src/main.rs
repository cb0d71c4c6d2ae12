//! scrapejobs - scrape job lifecycle manager
//!
//! Main entry point for the scrapejobs CLI.

mod cli;
mod commands;
mod exec;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use scrapejobs_config::{Config, ConfigLoader, ConfigValidator};
use scrapejobs_jobs::{JobService, RetryConfig, RetryingRepository, RunnerConfig};
use scrapejobs_store_sqlite::SqliteJobRepository;

use cli::Cli;

/// Initialize tracing with console and file output.
///
/// Log files are written to `<log_dir>` with daily rotation.
fn init_tracing(log_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("scrapejobs")
        .filename_suffix("log")
        .max_log_files(30)
        .build(log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keeps the background writer alive until exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        // Console goes to stderr so command output on stdout stays clean.
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

/// Build the job service described by `config`.
async fn build_service(config: &Config) -> Result<JobService, Box<dyn std::error::Error>> {
    let db_path = config.store.resolved_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = SqliteJobRepository::open(&db_path, config.store.busy_timeout()).await?;
    info!("Opened job store at {}", db_path.display());

    let retry = RetryConfig {
        initial_backoff: config.retry.initial_backoff(),
        max_backoff: config.retry.max_backoff(),
        max_attempts: config.retry.max_attempts,
        jitter: config.retry.jitter,
    };
    let repo = RetryingRepository::new(Arc::new(store), retry);

    Ok(JobService::new(repo, config.export.resolved_data_folder()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    let warnings = ConfigValidator::validate(&config)?.into_result()?;

    init_tracing(&config.export.resolved_data_folder().join("logs"))?;
    for warning in warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    let service = Arc::new(build_service(&config).await?);
    let runner_config = RunnerConfig {
        poll_interval: config.runner.poll_interval(),
        channel_capacity: config.runner.channel_capacity,
    };

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            signal_token.cancel();
        }
    });

    commands::run(cli.command, service, runner_config, &cancel).await
}
