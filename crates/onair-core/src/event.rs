//! Calendar event type consumed by the meeting scanner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A provider-agnostic calendar event.
///
/// Only the fields needed to decide whether an event is a real meeting and
/// when it starts are kept; providers normalize their own formats into this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Stable identifier, unique per occurrence.
    pub id: String,
    /// Event title, used for logging only.
    #[serde(default)]
    pub title: String,
    /// When the event starts.
    pub start: EventTime,
    /// Dedicated conference or event link, if any.
    #[serde(default)]
    pub url: Option<String>,
    /// Free-text description.
    #[serde(default)]
    pub notes: Option<String>,
    /// Location field (often holds a conference link).
    #[serde(default)]
    pub location: Option<String>,
    /// Number of attendees besides the calendar owner.
    #[serde(default)]
    pub attendee_count: u32,
}

impl CalendarEvent {
    /// Creates a timed event with no link, notes, location, or attendees.
    pub fn new(id: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            start: EventTime::from_utc(start),
            url: None,
            notes: None,
            location: None,
            attendee_count: 0,
        }
    }

    /// Creates an all-day event on the given date.
    pub fn all_day(id: impl Into<String>, date: chrono::NaiveDate) -> Self {
        Self {
            start: EventTime::from_date(date),
            ..Self::new(id, date.and_time(chrono::NaiveTime::MIN).and_utc())
        }
    }

    /// Builder: set title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder: set the conference/event link.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder: set the description.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builder: set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder: set the number of attendees besides the owner.
    pub fn with_attendees(mut self, count: u32) -> Self {
        self.attendee_count = count;
        self
    }

    /// Returns true for all-day events.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Returns the start instant for timed events.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start.as_datetime()
    }

    /// Iterates over the text fields that may carry a conference reference.
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        [&self.url, &self.notes, &self.location]
            .into_iter()
            .filter_map(|field| field.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn builder_sets_fields() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).unwrap();
        let event = CalendarEvent::new("evt-1", start)
            .with_title("Standup")
            .with_url("https://meet.google.com/abc")
            .with_attendees(3);

        assert_eq!(event.start_time(), Some(start));
        assert!(!event.is_all_day());
        assert_eq!(event.attendee_count, 3);
        assert_eq!(
            event.text_fields().collect::<Vec<_>>(),
            vec!["https://meet.google.com/abc"]
        );
    }

    #[test]
    fn all_day_has_no_start_time() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let event = CalendarEvent::all_day("holiday", date);
        assert!(event.is_all_day());
        assert!(event.start_time().is_none());
    }

    #[test]
    fn deserializes_with_missing_optional_fields() {
        let json = r#"{"id":"x","start":{"type":"DateTime","value":"2025-03-10T10:00:00Z"}}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, "x");
        assert_eq!(event.attendee_count, 0);
        assert!(event.url.is_none());
    }
}
