mod runner;
mod seed;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use engine::automation::PlaybookRunner;
use engine::client::LiveConnector;
use engine::conf::{EngineConfig, LogFormat, LogOutput, LoggingConfig};
use engine::store::Store;
use engine::EngineContext;

use crate::runner::CommandRunner;
use crate::seed::SeedFile;

#[tokio::main]
async fn main() -> Result<()> {
    // Phase 1: Basic tracing so we can log during config loading
    // Uses set_default (thread-local) so it can be replaced by Phase 2's global subscriber
    let _basic_tracing = init_tracing_basic();

    info!("Starting fleetd v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    // Phase 2: Re-initialize tracing with config (format, level)
    drop(_basic_tracing);
    init_tracing_from_config(&config.logging)?;

    info!("Configuration loaded successfully");
    info!(
        "Runtime calls time out after {}s, check playbook '{}'",
        config.runtime.operation_timeout_secs, config.automation.check_playbook_ref
    );

    let inventory_file = config.inventory_file.clone();
    let connector = Arc::new(LiveConnector::new(config.runtime.clone()));
    let ctx = EngineContext::new(config, Store::in_memory(), connector, |parts| {
        Arc::new(CommandRunner::new(parts)) as Arc<dyn PlaybookRunner>
    });

    match inventory_file {
        Some(path) => {
            SeedFile::load(&path)?
                .apply(&ctx.store, &ctx.vault)
                .await
                .context("Failed to seed inventory")?;
        }
        None => warn!("No inventory_file configured, starting with an empty fleet"),
    }

    ctx.start().await.context("Failed to start watcher engine")?;
    info!("✓ fleetd is ready");

    shutdown_signal().await;

    ctx.shutdown().await;
    info!("fleetd shut down gracefully");
    Ok(())
}

/// Phase 1: Basic tracing for startup (before config is loaded).
/// Returns a guard that must be dropped before Phase 2 sets the global subscriber.
fn init_tracing_basic() -> tracing::subscriber::DefaultGuard {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,fleetd=debug"));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_default(subscriber)
}

/// Phase 2: global subscriber from the logging section. `RUST_LOG` wins
/// over the configured level.
fn init_tracing_from_config(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match (&logging.format, &logging.output) {
        (LogFormat::Json, LogOutput::Stdout) => {
            let layer = fmt::layer().json().with_target(true).with_thread_ids(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Json, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::Stdout) => {
            let layer = fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        (LogFormat::Pretty, LogOutput::File { path }) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
    Ok(())
}

fn open_log_file(path: &str) -> Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file '{}'", path))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
