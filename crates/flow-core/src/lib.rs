//! Core data types and processing for water-monitoring telemetry
//!
//! This crate provides the fundamental data structures and the two
//! algorithmic components of the system: usage accounting over cumulative
//! flow-volume counters and rolling z-score anomaly detection. It owns no
//! I/O; callers feed it ordered reading sequences.

pub mod alerts;
pub mod anomaly;
pub mod calibration;
pub mod format;
pub mod pipeline;
pub mod types;
pub mod usage;

pub use alerts::*;
pub use anomaly::*;
pub use calibration::*;
pub use format::*;
pub use pipeline::*;
pub use types::*;
pub use usage::*;

use thiserror::Error;

/// Errors raised by the processing core
#[derive(Debug, Error)]
pub enum CoreError {
    /// A reading is missing a required field or carries an
    /// unrepresentable value
    #[error("invalid reading: missing or malformed field `{field}`")]
    InvalidReading { field: &'static str },

    /// A numeric series handed to the anomaly detector contains
    /// non-finite values
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
