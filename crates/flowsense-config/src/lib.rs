use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use flow_core::{AlertThresholds, DataSource, SensorCalibration};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub mode: Option<DataSource>,
    pub poll_interval: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub device: Option<DeviceConfig>,
    pub source: Option<SourceConfig>,
    pub http: Option<HttpConfig>,
    pub udp: Option<UdpConfig>,
    pub sink: Option<SinkConfig>,
    pub alerts: Option<AlertThresholds>,
    pub calibration: Option<SensorCalibration>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppConfig {
    /// Load configuration from FLOWSENSE_CONFIG path (TOML) if present,
    /// with reasonable defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FLOWSENSE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let cfg = if Path::new(&path).exists() {
            let s = fs::read_to_string(&path)?;
            toml::from_str::<AppConfig>(&s)?
        } else {
            AppConfig::default()
        };
        Ok(cfg)
    }

    /// Selected data source (default demo - no hardware required)
    pub fn data_source(&self) -> DataSource {
        self.source
            .as_ref()
            .and_then(|s| s.mode)
            .unwrap_or(DataSource::Demo)
    }

    /// Driver poll interval in seconds (default 10, clamped to 1..=3600)
    pub fn poll_interval(&self) -> u64 {
        let raw = self
            .source
            .as_ref()
            .and_then(|s| s.poll_interval)
            .unwrap_or(10);
        validate_range(raw as f64, 1.0, 3600.0, 10.0) as u64
    }

    /// Get HTTP bind address (default 0.0.0.0:8080)
    pub fn http_bind(&self) -> String {
        self.http
            .as_ref()
            .and_then(|h| h.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
    }

    /// Get UDP device-report bind address (default 0.0.0.0:9433)
    pub fn udp_bind(&self) -> String {
        self.udp
            .as_ref()
            .and_then(|u| u.bind.clone())
            .unwrap_or_else(|| "0.0.0.0:9433".to_string())
    }

    /// Directory for the local readings log, if configured
    pub fn sink_dir(&self) -> Option<String> {
        self.sink.as_ref().and_then(|s| s.dir.clone())
    }

    /// Alert thresholds, with out-of-range values replaced by defaults
    pub fn alert_thresholds(&self) -> AlertThresholds {
        let raw = self.alerts.unwrap_or_default();
        let defaults = AlertThresholds::default();
        AlertThresholds {
            pressure_high: validate_range(raw.pressure_high, 1.0, 10.0, defaults.pressure_high),
            pressure_low: validate_range(raw.pressure_low, 0.1, 5.0, defaults.pressure_low),
            flow_high: validate_range(raw.flow_high, 1.0, 50.0, defaults.flow_high),
            daily_usage_high: validate_range(
                raw.daily_usage_high,
                50.0,
                2000.0,
                defaults.daily_usage_high,
            ),
        }
    }

    /// Sensor calibration, with out-of-range factors replaced by defaults
    pub fn calibration(&self) -> SensorCalibration {
        let raw = self.calibration.unwrap_or_default();
        let defaults = SensorCalibration::default();
        SensorCalibration {
            flow_factor: validate_range(raw.flow_factor, 0.5, 1.5, defaults.flow_factor),
            pressure_zero: validate_range(raw.pressure_zero, -1.0, 1.0, defaults.pressure_zero),
            pressure_factor: validate_range(raw.pressure_factor, 0.5, 1.5, defaults.pressure_factor),
        }
    }
}

/// Clamp a numeric setting to its allowed range, falling back to the
/// default when out of range or non-finite
pub fn validate_range(value: f64, min: f64, max: f64, default: f64) -> f64 {
    if !value.is_finite() || value < min || value > max {
        default
    } else {
        value
    }
}
