//! Flowsense daemon - collection loop and local readings log
//!
//! This binary coordinates:
//! - Sensor reading collection (via drivers)
//! - Usage enrichment and alert evaluation
//! - Appending enriched readings to the local JSONL log

mod config;
mod scheduler;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use flow_ingest::{build_driver, DriverSettings, MeterDriver};
use flow_sinks::FsSink;

use crate::config::DaemonConfig;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Flowsense daemon");

    // Load configuration
    let config = DaemonConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    // Pick the driver for the configured source
    let udp_bind: SocketAddr = config
        .udp_bind
        .parse()
        .context("Invalid UDP bind address")?;
    let mut driver = build_driver(
        config.source,
        &DriverSettings {
            poll_interval: config.poll_interval,
            udp_bind,
        },
    );
    driver.start().await.context("Failed to start driver")?;
    info!("Meter driver started: {}", driver.name());

    // Local readings log
    let sink = FsSink::new(&config.sink_dir).context("Failed to open readings log")?;

    // Thresholds and calibration come from the shared app config file
    let app_cfg = flowsense_config::AppConfig::load().unwrap_or_default();

    // Create and run scheduler
    let mut scheduler = Scheduler::new(
        driver,
        app_cfg.calibration(),
        app_cfg.alert_thresholds(),
        sink,
    );

    // Setup signal handler for graceful shutdown
    let shutdown = setup_shutdown_handler();

    info!("Daemon running - press Ctrl+C to stop");

    // Run until shutdown signal
    tokio::select! {
        result = scheduler.run() => {
            if let Err(e) = result {
                error!("Scheduler error: {}", e);
                return Err(e);
            }
        }
        _ = shutdown => {
            info!("Shutdown signal received");
            scheduler.stop().await?;
        }
    }

    info!("Flowsense daemon stopped");
    Ok(())
}

/// Setup graceful shutdown handler
async fn setup_shutdown_handler() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to setup signal handler");
}
