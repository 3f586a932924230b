//! Water-meter driver adapters
//!
//! This crate provides the interface for receiving sensor readings from
//! the field device, plus a synthetic-data simulator used in demo mode
//! when no hardware is configured.

pub mod device_udp;
pub mod driver;
pub mod simulator;

pub use device_udp::*;
pub use driver::*;
pub use simulator::*;

use thiserror::Error;

use flow_core::{Reading, Source};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Driver error: {0}")]
    DriverError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("Invalid report: {0}")]
    InvalidReport(String),

    #[error("Timeout waiting for data")]
    Timeout,
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Trait for all meter drivers.
///
/// Every driver is a `Source` of readings for the pipeline; this trait
/// adds the lifecycle around it and a typed error channel for
/// driver-level callers.
#[async_trait::async_trait]
pub trait MeterDriver: Source {
    /// Driver name/identifier
    fn name(&self) -> &str;

    /// Initialize the driver and start data collection
    async fn start(&mut self) -> IngestResult<()>;

    /// Stop the driver and clean up resources
    async fn stop(&mut self) -> IngestResult<()>;

    /// Get the next reading (blocking)
    async fn get_reading(&mut self) -> IngestResult<Reading>;

    /// Check if driver is currently active
    fn is_active(&self) -> bool;
}
