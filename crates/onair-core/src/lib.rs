//! Core types: time, calendar events, meeting detection, debouncing, tracing

pub mod debounce;
pub mod event;
pub mod links;
pub mod time;
pub mod tracing;

pub use debounce::{DebounceConfig, Debouncer, Transition};
pub use event::CalendarEvent;
pub use links::{MeetingDetector, is_qualifying_meeting, DEFAULT_CONFERENCE_PATTERNS};
pub use time::{EventTime, TimeWindow};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
