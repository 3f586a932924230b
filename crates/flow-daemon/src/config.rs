//! Daemon configuration from environment variables

use anyhow::{bail, Context, Result};
use std::env;

use flow_core::DataSource;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Where readings come from (demo simulator or the live device)
    pub source: DataSource,

    /// Poll interval for the driver in seconds (default: 10)
    pub poll_interval: u64,

    /// Bind address for live device reports over UDP
    pub udp_bind: String,

    /// Directory for the local readings log (default: "data")
    pub sink_dir: String,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let source = match env::var("SOURCE_MODE")
            .unwrap_or_else(|_| "demo".to_string())
            .as_str()
        {
            "demo" => DataSource::Demo,
            "live" => DataSource::Live,
            other => bail!("Invalid SOURCE_MODE `{other}`, expected `demo` or `live`"),
        };

        let poll_interval: u64 = env::var("POLL_INTERVAL")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("Invalid POLL_INTERVAL")?;
        let poll_interval =
            flowsense_config::validate_range(poll_interval as f64, 1.0, 3600.0, 10.0) as u64;

        let udp_bind = env::var("UDP_BIND").unwrap_or_else(|_| "0.0.0.0:9433".to_string());

        let sink_dir = env::var("SINK_DIR").unwrap_or_else(|_| "data".to_string());

        Ok(Self {
            source,
            poll_interval,
            udp_bind,
            sink_dir,
        })
    }
}
