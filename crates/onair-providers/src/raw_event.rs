//! Raw event format emitted by calendar scripts.
//!
//! A calendar command prints a JSON array of objects such as:
//!
//! ```json
//! [
//!   {"id": "abc", "title": "Standup", "start": "2025-03-10T09:30:00+01:00",
//!    "url": "https://meet.google.com/abc-defg-hij", "attendees": 4},
//!   {"id": "hol", "start": "2025-03-10", "all_day": true}
//! ]
//! ```
//!
//! [`normalize_event`] converts each entry into a [`CalendarEvent`].

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use onair_core::{CalendarEvent, EventTime};

use crate::error::{ProviderError, ProviderResult};

/// Attendees, either as a plain count or as a list of addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAttendees {
    /// Number of attendees besides the owner.
    Count(u32),
    /// Attendee addresses; the owner's address is discounted.
    List(Vec<String>),
}

impl Default for RawAttendees {
    fn default() -> Self {
        Self::Count(0)
    }
}

/// An event as printed by a calendar command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Unique identifier of the occurrence.
    pub id: String,
    /// Title, for logs.
    #[serde(default)]
    pub title: String,
    /// RFC 3339 datetime, naive local datetime, or `YYYY-MM-DD` date.
    pub start: String,
    /// Forces all-day handling even if `start` carries a time.
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: RawAttendees,
}

/// Parses a start string into an [`EventTime`].
fn parse_start(start: &str, all_day: bool) -> ProviderResult<EventTime> {
    let start = start.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(start) {
        let utc = dt.with_timezone(&Utc);
        return Ok(if all_day {
            EventTime::from_date(dt.date_naive())
        } else {
            EventTime::from_utc(utc)
        });
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(start, format) {
            if all_day {
                return Ok(EventTime::from_date(naive.date()));
            }
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(EventTime::from_local)
                .ok_or_else(|| {
                    ProviderError::invalid_response(format!("nonexistent local time: {start}"))
                });
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(start, "%Y-%m-%d") {
        return Ok(EventTime::from_date(date));
    }

    Err(ProviderError::invalid_response(format!(
        "unrecognized start time: {start}"
    )))
}

/// Converts a raw event into a [`CalendarEvent`].
///
/// `owner` is the calendar owner's address; it is not counted when
/// attendees are given as a list.
pub fn normalize_event(raw: &RawEvent, owner: Option<&str>) -> ProviderResult<CalendarEvent> {
    if raw.id.trim().is_empty() {
        return Err(ProviderError::invalid_response("event without id"));
    }

    let start = parse_start(&raw.start, raw.all_day)?;
    let attendee_count = match &raw.attendees {
        RawAttendees::Count(n) => *n,
        RawAttendees::List(list) => list
            .iter()
            .filter(|addr| owner.is_none_or(|o| !addr.trim().eq_ignore_ascii_case(o.trim())))
            .count() as u32,
    };

    Ok(CalendarEvent {
        id: raw.id.clone(),
        title: raw.title.clone(),
        start,
        url: raw.url.clone(),
        notes: raw.notes.clone(),
        location: raw.location.clone(),
        attendee_count,
    })
}

/// Normalizes a batch of raw events, dropping (and logging) invalid ones.
pub fn normalize_events(raws: &[RawEvent], owner: Option<&str>) -> Vec<CalendarEvent> {
    raws.iter()
        .filter_map(|raw| match normalize_event(raw, owner) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(id = %raw.id, error = %e, "Skipping malformed calendar event");
                None
            }
        })
        .collect()
}
