mod bootstrap;
mod health;

use anyhow::Result;
use plusplus_core::config::{AppConfig, LoadOptions};
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    use plusplus_core::config::LogFormat::*;

    // RUST_LOG takes precedence over logging.level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.store.clone(),
    )
    .await?;

    log_started(app.store.backend_name());

    tokio::select! {
        result = app.slack_runner.start() => {
            if let Err(error) = result {
                tracing::warn!(
                    event_name = "system.server.runner_failed",
                    correlation_id = "runtime",
                    error = %error,
                    "socket mode runner stopped with an error"
                );
            } else {
                tracing::warn!(
                    event_name = "system.server.runner_stopped",
                    correlation_id = "runtime",
                    "socket mode runner stopped"
                );
            }
        }
        signal = wait_for_shutdown() => signal?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "plusplus-server stopping"
    );
    app.store.close().await?;

    Ok(())
}

fn log_started(storage_backend: &str) {
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        storage_backend,
        version = env!("CARGO_PKG_VERSION"),
        "plusplus-server started"
    );
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
