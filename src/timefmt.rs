//! Timestamp and interval parsing
//!
//! The backend returns timestamps as bare strings whose precision varies
//! with the stored value (seconds through nanoseconds). Layout selection
//! is driven purely by string length, with the second-precision form
//! additionally distinguishing `T`-separated from space-separated dates.
//!
//! Interval strings (`"10 minutes"`) come from the panel's GROUP BY time
//! clause and double as the resampling bucket width.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp layouts recognized by [`parse_time_string`], selected by
/// string length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampLayout {
    /// 19 characters, no sub-second digits
    Second,
    /// 23 characters, three sub-second digits
    Millisecond,
    /// 26 characters, six sub-second digits
    Microsecond,
    /// Everything else, nine sub-second digits
    Nanosecond,
}

impl TimestampLayout {
    /// Select the layout for a timestamp string
    pub fn for_str(s: &str) -> Self {
        match s.len() {
            19 => Self::Second,
            23 => Self::Millisecond,
            26 => Self::Microsecond,
            _ => Self::Nanosecond,
        }
    }

    /// The chrono format string for this layout
    ///
    /// Second precision comes in two shapes; the 11th character decides
    /// between the ISO `T` separator and a plain space.
    fn format(&self, s: &str) -> &'static str {
        match self {
            Self::Second => {
                if s.as_bytes().get(10) == Some(&b'T') {
                    "%Y-%m-%dT%H:%M:%S"
                } else {
                    "%Y-%m-%d %H:%M:%S"
                }
            }
            Self::Millisecond => "%Y-%m-%dT%H:%M:%S%.3f",
            Self::Microsecond => "%Y-%m-%dT%H:%M:%S%.6f",
            Self::Nanosecond => "%Y-%m-%dT%H:%M:%S%.9f",
        }
    }
}

/// Parse a backend timestamp string into a UTC instant
///
/// Timestamps carry no zone information; they are interpreted as UTC.
pub fn parse_time_string(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let layout = TimestampLayout::for_str(s);
    NaiveDateTime::parse_from_str(s, layout.format(s)).map(|naive| naive.and_utc())
}

/// Parse an interval string of the form `"<integer> <unit>"`
///
/// The unit is lowercased and prefix-matched against `second`, `minute`
/// and `hour`, so both `"10 minute"` and `"10 minutes"` work. Anything
/// unrecognized yields a zero duration, which callers treat as "no
/// resampling requested".
pub fn parse_interval_string(interval: &str) -> Duration {
    let mut seg = interval.split(' ');
    let (Some(count), Some(unit)) = (seg.next(), seg.next()) else {
        return Duration::zero();
    };

    let Ok(count) = count.parse::<i64>() else {
        return Duration::zero();
    };

    // TODO: support day/week and sub-second units once the query editor
    // offers them
    let unit = unit.to_lowercase();
    if unit.starts_with("second") {
        Duration::seconds(count)
    } else if unit.starts_with("minute") {
        Duration::minutes(count)
    } else if unit.starts_with("hour") {
        Duration::hours(count)
    } else {
        Duration::zero()
    }
}

/// The requested time range of a panel query, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive)
    pub from: DateTime<Utc>,
    /// End of the range (inclusive)
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Create a new time range
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Range covering the last `hours` hours from now
    pub fn last_hours(hours: i64) -> Self {
        let to = Utc::now();
        Self {
            from: to - Duration::hours(hours),
            to,
        }
    }

    /// Range covering the last `days` days from now
    pub fn last_days(days: i64) -> Self {
        Self::last_hours(days * 24)
    }

    /// Start of the range as Unix nanoseconds, saturating at the chrono
    /// representable bounds
    pub fn from_nanos(&self) -> i64 {
        self.from.timestamp_nanos_opt().unwrap_or(i64::MIN)
    }

    /// End of the range as Unix nanoseconds, saturating at the chrono
    /// representable bounds
    pub fn to_nanos(&self) -> i64 {
        self.to.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_second_precision_forms_agree() {
        let expected = DateTime::parse_from_rfc3339("2022-03-07T11:39:00+00:00")
            .unwrap()
            .with_timezone(&Utc);

        let spaced = parse_time_string("2022-03-07 11:39:00").unwrap();
        let iso = parse_time_string("2022-03-07T11:39:00").unwrap();

        assert_eq!(spaced, expected);
        assert_eq!(iso, expected);
    }

    #[test]
    fn test_parse_subsecond_precisions() {
        let milli = parse_time_string("2022-03-07T11:39:00.123").unwrap();
        assert_eq!(milli.timestamp_subsec_millis(), 123);

        let micro = parse_time_string("2022-03-07T11:39:00.123456").unwrap();
        assert_eq!(micro.timestamp_subsec_micros(), 123_456);

        let nano = parse_time_string("2022-03-07T11:39:00.123456789").unwrap();
        assert_eq!(nano.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn test_parse_rejects_layout_mismatch() {
        // 23 characters, but not millisecond-shaped
        assert!(parse_time_string("2022-03-07 11:39:00 abc").is_err());
        assert!(parse_time_string("not a timestamp").is_err());
    }

    #[test]
    fn test_parse_interval_units() {
        assert_eq!(parse_interval_string("10 minute"), Duration::minutes(10));
        assert_eq!(parse_interval_string("10 seconds"), Duration::seconds(10));
        assert_eq!(parse_interval_string("10 hours"), Duration::hours(10));
    }

    #[test]
    fn test_parse_interval_unrecognized_is_zero() {
        assert_eq!(parse_interval_string("10 fortnights"), Duration::zero());
        assert_eq!(parse_interval_string("ten minutes"), Duration::zero());
        assert_eq!(parse_interval_string("10"), Duration::zero());
        assert_eq!(parse_interval_string(""), Duration::zero());
    }

    #[test]
    fn test_time_range_nanos() {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2022, 10, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 10, 17, 0, 0, 0).unwrap(),
        );
        assert_eq!(range.from_nanos(), 1_665_360_000_000_000_000);
        assert_eq!(range.to_nanos(), 1_665_964_800_000_000_000);
    }
}
