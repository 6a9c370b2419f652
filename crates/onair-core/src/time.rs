//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start times
//! (which may be either a specific datetime or an all-day date), and
//! [`TimeWindow`] for defining calendar query ranges.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Represents the start time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::DateTime` from a datetime in any timezone.
    pub fn from_local<Tz: TimeZone>(dt: DateTime<Tz>) -> Self {
        Self::DateTime(dt.with_timezone(&Utc))
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Returns the datetime if this is a `DateTime` variant.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            Self::AllDay(_) => None,
        }
    }
}

/// A half-open time range `[start, end)` used for calendar queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// If `start` is after `end` the bounds are swapped.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Creates a window reaching `behind` into the past and `ahead` into the
    /// future of `now`.
    pub fn around(now: DateTime<Utc>, behind: Duration, ahead: Duration) -> Self {
        Self::new(now - behind, now + ahead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn all_day_has_no_datetime() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let time = EventTime::from_date(date);
        assert!(time.is_all_day());
        assert!(time.as_datetime().is_none());
    }

    #[test]
    fn from_local_converts_to_utc() {
        let offset = chrono::FixedOffset::east_opt(3600).unwrap();
        let local = offset.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        assert_eq!(EventTime::from_local(local), EventTime::DateTime(utc(9, 0)));
    }

    #[test]
    fn window_swaps_reversed_bounds() {
        let window = TimeWindow::new(utc(10, 0), utc(9, 0));
        assert_eq!(window.start, utc(9, 0));
        assert_eq!(window.end, utc(10, 0));
    }

    #[test]
    fn window_around_now() {
        let window = TimeWindow::around(utc(10, 0), Duration::hours(1), Duration::minutes(5));
        assert_eq!(window.start, utc(9, 0));
        assert_eq!(window.end, utc(10, 5));
    }
}
