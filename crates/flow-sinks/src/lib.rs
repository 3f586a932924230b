//! Local sinks for enriched readings
//!
//! The only persistence this system owns is a local append-only log;
//! long-term storage lives in the external cloud database and is out of
//! scope here.

use anyhow::Result;
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use flow_core::{EnrichedReading, Sink};

/// Appends enriched readings as JSON lines under a directory
pub struct FsSink {
    _dir: PathBuf,
    file: PathBuf,
}

impl FsSink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        create_dir_all(&dir)?;
        let file = dir.join("readings.jsonl");
        Ok(Self { _dir: dir, file })
    }
}

#[async_trait::async_trait]
impl Sink for FsSink {
    async fn emit(&mut self, reading: &EnrichedReading) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)?;
        let line = serde_json::to_string(reading)?;
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_core::Reading;

    #[tokio::test]
    async fn writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FsSink::new(dir.path()).unwrap();
        let enriched = EnrichedReading {
            reading: Reading {
                timestamp: 1_700_000_000,
                flow_rate: 8.5,
                pressure: 3.2,
                total_volume: Some(512.0),
                battery_percentage: None,
            },
            interval_volume: 2.0,
            hourly_usage: 10.0,
            daily_usage: 120.0,
        };
        sink.emit(&enriched).await.unwrap();
        sink.emit(&enriched).await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("readings.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\"hourly_usage\""));
    }
}
