//! Alert-threshold evaluation for enriched readings

use std::fmt::Display;

use chrono::TimeZone;
use serde::{Deserialize, Serialize};

use crate::format::format_timestamp;
use crate::types::{EnrichedReading, Timestamp};

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

/// A triggered alert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
    pub timestamp: Timestamp,
}

/// User-configurable alert thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertThresholds {
    /// High line pressure, bar
    pub pressure_high: f64,
    /// Low line pressure, bar
    pub pressure_low: f64,
    /// High flow rate, L/min
    pub flow_high: f64,
    /// Daily usage limit, liters
    pub daily_usage_high: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            pressure_high: 6.0,
            pressure_low: 1.0,
            flow_high: 20.0,
            daily_usage_high: 500.0,
        }
    }
}

/// Evaluate a reading against the configured thresholds.
///
/// Pressure breaches are high severity; flow and usage breaches medium.
/// The zone is used for the wall-clock time in alert messages and should
/// be the one the usage ledger accounts in.
pub fn check_alerts<Tz: TimeZone>(
    data: &EnrichedReading,
    thresholds: &AlertThresholds,
    tz: &Tz,
) -> Vec<Alert>
where
    Tz::Offset: Display,
{
    let mut alerts = Vec::new();
    let timestamp = data.timestamp();
    let when = format_timestamp(timestamp, tz);

    let pressure = data.reading.pressure;
    if pressure > thresholds.pressure_high {
        alerts.push(Alert {
            message: format!(
                "High pressure detected: {pressure:.1} bar (threshold: {:.1} bar) at {when}",
                thresholds.pressure_high
            ),
            severity: Severity::High,
            timestamp,
        });
    }
    if pressure < thresholds.pressure_low {
        alerts.push(Alert {
            message: format!(
                "Low pressure detected: {pressure:.1} bar (threshold: {:.1} bar) at {when}",
                thresholds.pressure_low
            ),
            severity: Severity::High,
            timestamp,
        });
    }

    let flow_rate = data.reading.flow_rate;
    if flow_rate > thresholds.flow_high {
        alerts.push(Alert {
            message: format!(
                "High flow rate detected: {flow_rate:.1} L/min (threshold: {:.1} L/min) at {when}",
                thresholds.flow_high
            ),
            severity: Severity::Medium,
            timestamp,
        });
    }

    if data.daily_usage > thresholds.daily_usage_high {
        alerts.push(Alert {
            message: format!(
                "Daily water usage exceeded: {:.1} L (threshold: {:.1} L)",
                data.daily_usage, thresholds.daily_usage_high
            ),
            severity: Severity::Medium,
            timestamp,
        });
    }

    alerts
}
