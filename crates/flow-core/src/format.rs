//! Display formatting for volumes and timestamps

use std::fmt::Display;

use chrono::TimeZone;

use crate::types::Timestamp;

/// Format a volume in liters with an appropriate unit tier
pub fn format_volume(liters: f64) -> String {
    if liters < 1.0 {
        format!("{:.0} mL", liters * 1000.0)
    } else if liters < 10.0 {
        format!("{liters:.2} L")
    } else if liters < 1000.0 {
        format!("{liters:.1} L")
    } else {
        format!("{:.2} m\u{b3}", liters / 1000.0)
    }
}

/// Format a Unix timestamp as `YYYY-MM-DD HH:MM:SS` in the given zone,
/// which should match the zone the usage ledger accounts in
pub fn format_timestamp<Tz: TimeZone>(timestamp: Timestamp, tz: &Tz) -> String
where
    Tz::Offset: Display,
{
    match tz.timestamp_opt(timestamp, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "invalid timestamp".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_tiers() {
        assert_eq!(format_volume(0.25), "250 mL");
        assert_eq!(format_volume(2.5), "2.50 L");
        assert_eq!(format_volume(245.64), "245.6 L");
        assert_eq!(format_volume(1500.0), "1.50 m\u{b3}");
    }

    #[test]
    fn test_timestamp_formatting() {
        use chrono::{FixedOffset, Utc};

        assert_eq!(
            format_timestamp(1_704_067_200, &Utc),
            "2024-01-01 00:00:00"
        );
        assert_eq!(format_timestamp(i64::MAX, &Utc), "invalid timestamp");

        // Renders wall-clock time in the caller's zone
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            format_timestamp(1_704_067_200, &plus_two),
            "2024-01-01 02:00:00"
        );
    }
}
