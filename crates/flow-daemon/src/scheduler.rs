//! Reading collection and enrichment scheduler

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{error, info, warn};

use flow_core::{
    check_alerts, format_volume, AlertThresholds, SensorCalibration, Sink, Source, UsageLedger,
};
use flow_ingest::MeterDriver;
use flow_sinks::FsSink;

/// Scheduler coordinates collection, enrichment and alerting
pub struct Scheduler {
    driver: Box<dyn MeterDriver>,
    ledger: UsageLedger<Local>,
    calibration: SensorCalibration,
    thresholds: AlertThresholds,
    sink: FsSink,
    running: bool,
}

impl Scheduler {
    pub fn new(
        driver: Box<dyn MeterDriver>,
        calibration: SensorCalibration,
        thresholds: AlertThresholds,
        sink: FsSink,
    ) -> Self {
        Self {
            driver,
            ledger: UsageLedger::new(Local),
            calibration,
            thresholds,
            sink,
            running: false,
        }
    }

    /// Run the main collection loop
    pub async fn run(&mut self) -> Result<()> {
        self.running = true;

        info!("Scheduler started");
        info!("Driver: {}", self.driver.name());

        while self.running {
            match self.process_reading().await {
                Ok(()) => {}
                Err(e) => {
                    error!("Error processing reading: {}", e);
                    // Continue running despite errors
                }
            }
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Process a single reading cycle
    async fn process_reading(&mut self) -> Result<()> {
        let raw = self
            .driver
            .next_reading()
            .await
            .context("Failed to get reading from driver")?;

        let reading = self.calibration.apply(&raw);

        let enriched = self
            .ledger
            .push(&reading)
            .context("Failed to enrich reading")?;

        info!(
            "Reading: timestamp={}, flow={:.2} L/min, daily={}",
            enriched.timestamp(),
            enriched.reading.flow_rate,
            format_volume(enriched.daily_usage)
        );

        for alert in check_alerts(&enriched, &self.thresholds, &Local) {
            warn!(severity = ?alert.severity, "{}", alert.message);
        }

        self.sink
            .emit(&enriched)
            .await
            .context("Failed to write reading to sink")?;

        Ok(())
    }

    /// Stop the scheduler
    pub async fn stop(&mut self) -> Result<()> {
        info!("Stopping scheduler...");
        self.running = false;

        if let Err(e) = self.driver.stop().await {
            warn!("Error stopping driver: {}", e);
        }

        info!("Scheduler stopped successfully");
        Ok(())
    }

    /// Check if scheduler is running
    #[allow(dead_code)]
    pub fn is_running(&self) -> bool {
        self.running
    }
}
