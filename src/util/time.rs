//! Clock and date-time formatting helpers.
//!
//! All timestamps are stored as naive `YYYY-MM-DD HH:MM:SS` strings.

use chrono::{NaiveDateTime, Timelike, Utc};

/// Storage format for every date column.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the current time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        // Second precision so that a stored value reads back equal.
        truncate_to_seconds(Utc::now().naive_utc())
    }
}

/// A clock frozen at a given instant. Used by tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[must_use]
pub fn format_datetime(value: &NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Parse a stored date-time.
///
/// Returns `None` for empty input and for zero dates such as
/// `0000-00-00 00:00:00`, which do not denote a point in time. RFC 3339
/// input is accepted and converted to UTC.
#[must_use]
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.starts_with("0000-00-00") {
        return None;
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT) {
        return Some(naive);
    }

    chrono::DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| truncate_to_seconds(dt.naive_utc()))
}

fn truncate_to_seconds(value: NaiveDateTime) -> NaiveDateTime {
    value.with_nanosecond(0).unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_round_trips_through_parse() {
        let value = parse_datetime("2013-06-01 12:30:45").expect("parse");
        assert_eq!(format_datetime(&value), "2013-06-01 12:30:45");
    }

    #[test]
    fn zero_and_empty_dates_are_absent() {
        assert_eq!(parse_datetime("0000-00-00 00:00:00"), None);
        assert_eq!(parse_datetime("   "), None);
        assert_eq!(parse_datetime("not a date"), None);
    }

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        let value = parse_datetime("2024-01-02T03:04:05.678+02:00").expect("parse");
        assert_eq!(format_datetime(&value), "2024-01-02 01:04:05");
    }

    #[test]
    fn system_clock_has_whole_seconds() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }
}
