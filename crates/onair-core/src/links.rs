//! Meeting detection for calendar events.
//!
//! An event is a "real meeting" when it is not an all-day event and either
//! references a known video-conferencing service (in its link, notes, or
//! location) or has at least one attendee besides the owner.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use onair_core::{CalendarEvent, is_qualifying_meeting};
//!
//! let event = CalendarEvent::new("evt-1", Utc::now())
//!     .with_notes("Join at https://zoom.us/j/123456789");
//! assert!(is_qualifying_meeting(&event));
//! ```

use std::sync::LazyLock;

use regex::{RegexSet, RegexSetBuilder};

use crate::event::CalendarEvent;

/// Substrings identifying video-conference references.
pub const DEFAULT_CONFERENCE_PATTERNS: &[&str] = &[
    "zoom.us",
    "zoomgov.com",
    "meet.google.com",
    "teams.microsoft.com",
    "teams.live.com",
    "meet.jit.si",
    "webex.com",
    "whereby.com",
    "gotomeeting.com",
    "chime.aws",
    "bluejeans.com",
    "meet.lync.com",
    "facetime.apple.com",
    "around.co",
    "discord.gg",
    "slack.com/huddle",
];

static DEFAULT_DETECTOR: LazyLock<MeetingDetector> = LazyLock::new(MeetingDetector::new);

/// Classifies calendar events as meetings.
///
/// Patterns are matched as case-insensitive literal substrings.
#[derive(Debug, Clone)]
pub struct MeetingDetector {
    patterns: Vec<String>,
    set: RegexSet,
}

impl Default for MeetingDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl MeetingDetector {
    /// Creates a detector using [`DEFAULT_CONFERENCE_PATTERNS`].
    pub fn new() -> Self {
        let patterns: Vec<String> = DEFAULT_CONFERENCE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
        // Escaped literals always compile.
        let set = build_set(&patterns).unwrap_or_else(|_| RegexSet::empty());
        Self { patterns, set }
    }

    /// Creates a detector with the default patterns plus `extra` ones.
    ///
    /// Blank entries are ignored.
    pub fn with_extra_patterns<I, S>(extra: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns: Vec<String> = DEFAULT_CONFERENCE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
        for pattern in extra {
            let pattern = pattern.as_ref().trim();
            if !pattern.is_empty() && !patterns.iter().any(|p| p.eq_ignore_ascii_case(pattern)) {
                patterns.push(pattern.to_string());
            }
        }
        let set = build_set(&patterns)?;
        Ok(Self { patterns, set })
    }

    /// Returns the patterns this detector matches.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Returns the first pattern found in the event's link, notes, or
    /// location fields.
    pub fn conference_pattern(&self, event: &CalendarEvent) -> Option<&str> {
        event.text_fields().find_map(|text| {
            self.set
                .matches(text)
                .iter()
                .next()
                .map(|idx| self.patterns[idx].as_str())
        })
    }

    /// Returns true if the event references a video conference.
    pub fn has_conference_link(&self, event: &CalendarEvent) -> bool {
        event.text_fields().any(|text| self.set.is_match(text))
    }

    /// Returns true if the event is a real meeting.
    pub fn is_qualifying_meeting(&self, event: &CalendarEvent) -> bool {
        if event.is_all_day() {
            return false;
        }
        event.attendee_count > 0 || self.has_conference_link(event)
    }
}

fn build_set(patterns: &[String]) -> Result<RegexSet, regex::Error> {
    RegexSetBuilder::new(patterns.iter().map(|p| regex::escape(p)))
        .case_insensitive(true)
        .build()
}

/// Classifies an event with the default pattern list.
///
/// See [`MeetingDetector::is_qualifying_meeting`] for details.
pub fn is_qualifying_meeting(event: &CalendarEvent) -> bool {
    DEFAULT_DETECTOR.is_qualifying_meeting(event)
}
