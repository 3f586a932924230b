//! Core data types for water-sensor telemetry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::CoreError;

/// Timestamp type (Unix epoch seconds)
pub type Timestamp = i64;

/// Where readings come from: synthetic demo data or a live device.
///
/// Passed explicitly to whatever selects a driver; never read from
/// ambient global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Demo,
    Live,
}

/// A point-in-time sensor sample with typed, named fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Unix timestamp of the sample
    pub timestamp: Timestamp,

    /// Flow rate in liters/minute (non-negative)
    pub flow_rate: f64,

    /// Line pressure in bar
    pub pressure: f64,

    /// Cumulative liters metered since device start, when the device
    /// reports its volume counter. Monotonically non-decreasing except
    /// across device restarts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_volume: Option<f64>,

    /// Device battery level, percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_percentage: Option<f64>,
}

/// A `Reading` augmented with derived usage figures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedReading {
    #[serde(flatten)]
    pub reading: Reading,

    /// Liters consumed since the previous reading (>= 0)
    pub interval_volume: f64,

    /// Running sum of interval volume since the start of the current hour
    pub hourly_usage: f64,

    /// Running sum of interval volume since the start of the current
    /// calendar day
    pub daily_usage: f64,
}

impl EnrichedReading {
    pub fn timestamp(&self) -> Timestamp {
        self.reading.timestamp
    }
}

/// Schemaless sensor record as it arrives off the wire
///
/// Field devices send ad-hoc JSON objects (`total_ml`, float timestamps);
/// this type tolerates whatever shape shows up and converts to a typed
/// `Reading` via `TryFrom`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorRecord {
    #[serde(flatten)]
    pub fields: HashMap<String, FieldValue>,
}

/// A raw record value with null handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
    Null,
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            FieldValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl SensorRecord {
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(FieldValue::as_f64)
    }
}

impl TryFrom<SensorRecord> for Reading {
    type Error = CoreError;

    /// Convert a raw record to a typed reading.
    ///
    /// `timestamp` is required; devices report it as integer or float
    /// epoch seconds. `total_ml` (milliliters, the field-device counter
    /// unit) takes precedence over an already-converted `total_volume`.
    fn try_from(record: SensorRecord) -> Result<Self, Self::Error> {
        let timestamp = record
            .fields
            .get("timestamp")
            .and_then(FieldValue::as_i64)
            .ok_or(CoreError::InvalidReading { field: "timestamp" })?;

        let total_volume = record
            .get_f64("total_ml")
            .map(|ml| ml / 1000.0)
            .or_else(|| record.get_f64("total_volume"));

        Ok(Reading {
            timestamp,
            flow_rate: record.get_f64("flow_rate").unwrap_or(0.0),
            pressure: record.get_f64("pressure").unwrap_or(0.0),
            total_volume,
            battery_percentage: record.get_f64("battery_percentage"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_conversions() {
        let float_val = FieldValue::Float(3.2);
        assert_eq!(float_val.as_f64(), Some(3.2));

        let int_val = FieldValue::Integer(42);
        assert_eq!(int_val.as_i64(), Some(42));
        assert_eq!(int_val.as_f64(), Some(42.0));

        let null_val = FieldValue::Null;
        assert!(null_val.is_null());
        assert_eq!(null_val.as_f64(), None);
    }

    #[test]
    fn test_record_to_reading_converts_milliliters() {
        let json = r#"{"timestamp":1700000000,"flow_rate":8.5,"pressure":3.2,"total_ml":512000.0,"battery_percentage":85}"#;
        let record: SensorRecord = serde_json::from_str(json).unwrap();
        let reading = Reading::try_from(record).unwrap();

        assert_eq!(reading.timestamp, 1_700_000_000);
        assert_eq!(reading.flow_rate, 8.5);
        assert_eq!(reading.total_volume, Some(512.0));
        assert_eq!(reading.battery_percentage, Some(85.0));
    }

    #[test]
    fn test_record_missing_timestamp_is_invalid() {
        let json = r#"{"flow_rate":8.5,"pressure":3.2}"#;
        let record: SensorRecord = serde_json::from_str(json).unwrap();
        let err = Reading::try_from(record).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InvalidReading { field: "timestamp" }
        ));
    }

    #[test]
    fn test_record_float_timestamp_tolerated() {
        // The original backend stores timestamps as float seconds
        let json = r#"{"timestamp":1700000000.7,"flow_rate":2.0,"pressure":3.0}"#;
        let record: SensorRecord = serde_json::from_str(json).unwrap();
        let reading = Reading::try_from(record).unwrap();

        assert_eq!(reading.timestamp, 1_700_000_000);
        assert_eq!(reading.total_volume, None);
    }

    #[test]
    fn test_enriched_reading_serde_flattens() {
        let enriched = EnrichedReading {
            reading: Reading {
                timestamp: 1_700_000_000,
                flow_rate: 8.0,
                pressure: 3.5,
                total_volume: Some(500.0),
                battery_percentage: None,
            },
            interval_volume: 2.0,
            hourly_usage: 10.0,
            daily_usage: 120.0,
        };

        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["timestamp"], 1_700_000_000_i64);
        assert_eq!(json["hourly_usage"], 10.0);
        assert!(json.get("battery_percentage").is_none());
    }
}
