//! Rolling z-score anomaly detection
//!
//! Flags points whose deviation from the local rolling mean exceeds a
//! z-score threshold. The rolling window is centered and *includes* the
//! point under test, matching the original detector. That is a known
//! limitation: an extreme value inflates the standard deviation of its
//! own window and partially masks itself. The behavior is kept because
//! changing it changes sensitivity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::EnrichedReading;
use crate::{CoreError, CoreResult};

/// Detector parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnomalyParams {
    /// Rolling window width in samples
    pub window: usize,
    /// Absolute z-score above which a point is flagged
    pub threshold: f64,
}

impl Default for AnomalyParams {
    fn default() -> Self {
        Self {
            window: 20,
            threshold: 3.0,
        }
    }
}

/// Which sensor signal to scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    FlowRate,
    Pressure,
}

impl FromStr for Signal {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flow_rate" => Ok(Signal::FlowRate),
            "pressure" => Ok(Signal::Pressure),
            other => Err(CoreError::InvalidInput(format!(
                "unknown signal `{other}`, expected `flow_rate` or `pressure`"
            ))),
        }
    }
}

/// Extract one signal from an enriched series, index-aligned
pub fn signal_series(readings: &[EnrichedReading], signal: Signal) -> Vec<f64> {
    readings
        .iter()
        .map(|e| match signal {
            Signal::FlowRate => e.reading.flow_rate,
            Signal::Pressure => e.reading.pressure,
        })
        .collect()
}

/// Scan a numeric series for outliers.
///
/// Returns a boolean series aligned index-for-index with the input. A
/// position is flagged when the centered window of `params.window`
/// samples fits entirely in the series, its sample standard deviation is
/// positive, and the point's absolute z-score exceeds the threshold.
///
/// Positions where the window does not fit are indeterminate and
/// reported as `false`, as is a window with zero deviation (all values
/// identical - no division by zero). An empty series or a window wider
/// than the series yields an all-false result, not an error. Non-finite
/// values in the series are rejected with [`CoreError::InvalidInput`].
pub fn detect_anomalies(series: &[f64], params: &AnomalyParams) -> CoreResult<Vec<bool>> {
    if let Some(bad) = series.iter().find(|v| !v.is_finite()) {
        return Err(CoreError::InvalidInput(format!(
            "non-finite value in series: {bad}"
        )));
    }

    let n = series.len();
    let w = params.window;
    let mut flags = vec![false; n];
    if w < 2 || w > n {
        return Ok(flags);
    }

    let half = w / 2;
    for (i, flag) in flags.iter_mut().enumerate() {
        let Some(lo) = i.checked_sub(half) else {
            continue;
        };
        let hi = lo + w;
        if hi > n {
            continue;
        }

        let window = &series[lo..hi];
        let mean = window.iter().sum::<f64>() / w as f64;
        // Sample standard deviation (ddof = 1), matching the original's
        // rolling std
        let variance = window
            .iter()
            .map(|v| {
                let d = v - mean;
                d * d
            })
            .sum::<f64>()
            / (w as f64 - 1.0);
        let std = variance.sqrt();

        if std > 0.0 {
            let z = (series[i] - mean) / std;
            *flag = z.abs() > params.threshold;
        }
    }

    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_series_with_spike_flags_only_spike() {
        let mut series = vec![5.0; 30];
        series[15] = 500.0;

        let flags = detect_anomalies(&series, &AnomalyParams::default()).unwrap();

        assert_eq!(flags.len(), 30);
        for (i, flag) in flags.iter().enumerate() {
            assert_eq!(*flag, i == 15, "unexpected flag at index {i}");
        }
    }

    #[test]
    fn test_identical_values_never_flag() {
        let series = vec![7.5; 40];
        let flags = detect_anomalies(&series, &AnomalyParams::default()).unwrap();
        assert!(flags.iter().all(|f| !f));
    }

    #[test]
    fn test_short_series_all_false_not_error() {
        let series = vec![1.0, 2.0, 3.0];
        let flags = detect_anomalies(&series, &AnomalyParams::default()).unwrap();
        assert_eq!(flags, vec![false, false, false]);
    }

    #[test]
    fn test_empty_series() {
        let flags = detect_anomalies(&[], &AnomalyParams::default()).unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn test_non_finite_value_is_invalid_input() {
        let series = vec![1.0, f64::NAN, 3.0];
        let err = detect_anomalies(&series, &AnomalyParams::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn test_odd_window_detects_spike() {
        let mut series = vec![10.0, 10.2, 9.8, 10.1, 9.9, 10.0, 10.1, 9.9, 10.2, 9.8];
        series[5] = 80.0;

        let params = AnomalyParams {
            window: 5,
            threshold: 1.5,
        };
        let flags = detect_anomalies(&series, &params).unwrap();

        assert!(flags[5]);
        assert!(!flags[0], "window cannot fit at the series head");
        assert!(!flags[9], "window cannot fit at the series tail");
    }

    #[test]
    fn test_signal_parsing() {
        assert_eq!("flow_rate".parse::<Signal>().unwrap(), Signal::FlowRate);
        assert_eq!("pressure".parse::<Signal>().unwrap(), Signal::Pressure);
        assert!("volume".parse::<Signal>().is_err());
    }
}
