//! Sensor calibration factors

use serde::{Deserialize, Serialize};

use crate::types::Reading;

/// User-adjustable calibration for the flow meter and pressure sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SensorCalibration {
    /// Multiplier applied to the raw flow rate
    pub flow_factor: f64,
    /// Pressure reading at zero applied pressure, bar
    pub pressure_zero: f64,
    /// Multiplier applied after zero-offset removal
    pub pressure_factor: f64,
}

impl Default for SensorCalibration {
    fn default() -> Self {
        Self {
            flow_factor: 1.0,
            pressure_zero: 0.0,
            pressure_factor: 1.0,
        }
    }
}

impl SensorCalibration {
    /// Apply calibration to a raw reading.
    ///
    /// Derived volume fields are left to the usage ledger; the cumulative
    /// counter is the device's own metering and is not rescaled.
    pub fn apply(&self, reading: &Reading) -> Reading {
        Reading {
            flow_rate: (reading.flow_rate * self.flow_factor).max(0.0),
            pressure: (reading.pressure - self.pressure_zero) * self.pressure_factor,
            ..reading.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Reading {
        Reading {
            timestamp: 1_700_000_000,
            flow_rate: 10.0,
            pressure: 3.5,
            total_volume: Some(500.0),
            battery_percentage: None,
        }
    }

    #[test]
    fn test_identity_calibration_is_noop() {
        let calibrated = SensorCalibration::default().apply(&raw());
        assert_eq!(calibrated, raw());
    }

    #[test]
    fn test_factors_applied() {
        let cal = SensorCalibration {
            flow_factor: 1.1,
            pressure_zero: 0.5,
            pressure_factor: 2.0,
        };
        let calibrated = cal.apply(&raw());

        assert!((calibrated.flow_rate - 11.0).abs() < 1e-9);
        assert!((calibrated.pressure - 6.0).abs() < 1e-9);
        // Counter is the device's metering, untouched
        assert_eq!(calibrated.total_volume, Some(500.0));
    }

    #[test]
    fn test_flow_clamped_non_negative() {
        let cal = SensorCalibration {
            flow_factor: -1.0,
            ..Default::default()
        };
        let calibrated = cal.apply(&raw());
        assert_eq!(calibrated.flow_rate, 0.0);
    }
}
