use anyhow::Result;

use crate::{EnrichedReading, Reading};

/// Producer of raw readings (meter drivers)
#[async_trait::async_trait]
pub trait Source: Send + Sync {
    async fn next_reading(&mut self) -> Result<Reading>;
}

/// Destination for enriched readings (local log, future exporters)
#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn emit(&mut self, reading: &EnrichedReading) -> Result<()>;
}
