//! Usage accounting over cumulative flow-volume counters
//!
//! Consumes a time-ordered stream of readings and derives per-interval
//! consumption plus rolling hourly and daily totals that reset on
//! wall-clock hour and calendar-day boundaries.

use chrono::{NaiveDate, TimeZone, Timelike};

use crate::types::{EnrichedReading, Reading, Timestamp};
use crate::{CoreError, CoreResult};

/// Stateful accountant that turns `Reading`s into `EnrichedReading`s.
///
/// Readings must be pushed in ascending timestamp order (sorting is the
/// caller's responsibility). Duplicate or out-of-order timestamps are
/// tolerated and contribute zero interval volume - never negative usage.
///
/// Boundary detection happens in the ledger's timezone: hourly totals
/// reset when the hour-of-day changes (or the day does), daily totals
/// when the calendar day changes. Each reset fires exactly once per
/// boundary crossing, before the current interval volume is added.
#[derive(Debug, Clone)]
pub struct UsageLedger<Tz: TimeZone> {
    tz: Tz,
    prev: Option<PrevSample>,
    hourly_sum: f64,
    daily_sum: f64,
}

#[derive(Debug, Clone)]
struct PrevSample {
    timestamp: Timestamp,
    total_volume: Option<f64>,
    day: NaiveDate,
    hour: u32,
}

impl<Tz: TimeZone> UsageLedger<Tz> {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            prev: None,
            hourly_sum: 0.0,
            daily_sum: 0.0,
        }
    }

    /// Process the next reading in the stream.
    ///
    /// Fails only when the timestamp is outside the representable
    /// calendar range; all other oddities (counter resets, duplicates)
    /// are clamped by policy.
    pub fn push(&mut self, reading: &Reading) -> CoreResult<EnrichedReading> {
        let local = self
            .tz
            .timestamp_opt(reading.timestamp, 0)
            .single()
            .ok_or(CoreError::InvalidReading { field: "timestamp" })?;
        let day = local.date_naive();
        let hour = local.hour();

        let interval_volume = match &self.prev {
            None => 0.0,
            Some(prev) => interval_volume(prev, reading),
        };

        if let Some(prev) = &self.prev {
            let day_changed = day != prev.day;
            if day_changed {
                self.daily_sum = 0.0;
            }
            if day_changed || hour != prev.hour {
                self.hourly_sum = 0.0;
            }
        }

        self.hourly_sum += interval_volume;
        self.daily_sum += interval_volume;

        self.prev = Some(PrevSample {
            timestamp: reading.timestamp,
            total_volume: reading.total_volume,
            day,
            hour,
        });

        Ok(EnrichedReading {
            reading: reading.clone(),
            interval_volume,
            hourly_usage: self.hourly_sum,
            daily_usage: self.daily_sum,
        })
    }
}

/// Liters consumed between the previous sample and this reading.
///
/// Prefers the device's cumulative counter when both samples carry one;
/// the difference is clamped at zero so a counter reset (device restart)
/// reads as no usage rather than negative usage. Without a counter the
/// volume is integrated from the flow rate (L/min) over the elapsed
/// minutes, with elapsed time clamped at zero.
fn interval_volume(prev: &PrevSample, reading: &Reading) -> f64 {
    match (prev.total_volume, reading.total_volume) {
        (Some(prev_vol), Some(cur_vol)) => (cur_vol - prev_vol).max(0.0),
        _ => {
            let elapsed_minutes = (reading.timestamp - prev.timestamp).max(0) as f64 / 60.0;
            reading.flow_rate * elapsed_minutes
        }
    }
}

/// Enrich an ordered batch of readings in one pass.
///
/// Empty input produces empty output; a single reading produces all-zero
/// derived fields.
pub fn enrich_readings<Tz: TimeZone>(
    readings: &[Reading],
    tz: Tz,
) -> CoreResult<Vec<EnrichedReading>> {
    let mut ledger = UsageLedger::new(tz);
    readings.iter().map(|r| ledger.push(r)).collect()
}
