//! Journey Engine
//!
//! Rebuilds visitor journeys from the raw event log:
//! - Periodic incremental rebuilds of recently active sessions
//! - On-demand consolidation of every IP's events into sessions
//! - Outcome, friction, confidence and bot classification per journey

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use clickhouse_client::{ClickHouseClient, ClickHouseConfig};
use engine_core::{EventStore, HeuristicsConfig, JourneyStore};
use telemetry::{health, init_tracing_from_env};
use worker::{ConsolidationTrigger, RebuildScheduler, SchedulerConfig};

/// Application configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    clickhouse: ClickHouseConfig,

    #[serde(default)]
    scheduler: SchedulerConfig,

    #[serde(default)]
    heuristics: HeuristicsConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Journey Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    let clickhouse = Arc::new(
        ClickHouseClient::new(config.clickhouse.clone())
            .context("Failed to create ClickHouse client")?,
    );

    check_health(&clickhouse).await;

    if let Err(e) = clickhouse_client::init_schema(&clickhouse).await {
        error!(error = %e, "Failed to initialize ClickHouse schema");
        // Continue anyway - schema might already exist
    }

    let events: Arc<dyn EventStore> = clickhouse.clone();
    let journeys: Arc<dyn JourneyStore> = clickhouse.clone();
    let scheduler = Arc::new(RebuildScheduler::new(
        config.scheduler.clone(),
        events,
        journeys,
        config.heuristics.clone(),
    ));

    let trigger = scheduler.trigger();
    let handles = scheduler.start();

    run_until_shutdown(trigger).await;

    info!("Shutting down...");
    for handle in handles {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables, e.g. JOURNEY__CLICKHOUSE__URL
        .add_source(
            config::Environment::with_prefix("JOURNEY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    info!(
        url = %config.clickhouse.url,
        database = %config.clickhouse.database,
        rebuild_interval_secs = config.scheduler.rebuild_interval_secs,
        lookback_hours = config.scheduler.lookback_hours,
        site_id = config.scheduler.site_id.as_deref().unwrap_or("all"),
        "Loaded configuration"
    );

    Ok(config)
}

/// Check component health on startup.
async fn check_health(clickhouse: &ClickHouseClient) {
    if clickhouse_client::check_connection(clickhouse).await {
        health().clickhouse.set_healthy();
        info!("ClickHouse connection: healthy");
    } else {
        health().clickhouse.set_unhealthy("Connection failed");
        error!("ClickHouse connection: unhealthy");
    }
}

/// Waits for Ctrl+C or SIGTERM, firing a consolidation on every SIGHUP.
async fn run_until_shutdown(trigger: ConsolidationTrigger) {
    #[cfg(unix)]
    let hangups = async {
        match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(mut hangup) => {
                while hangup.recv().await.is_some() {
                    info!("Received SIGHUP, queueing consolidation");
                    trigger.fire();
                }
            }
            Err(e) => warn!(error = %e, "Failed to install SIGHUP handler"),
        }
        std::future::pending::<()>().await;
    };

    #[cfg(not(unix))]
    let hangups = {
        let _ = trigger;
        std::future::pending::<()>()
    };

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = hangups => {}
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
