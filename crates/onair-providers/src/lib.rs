//! Collaborator traits and command-backed implementations.
//!
//! The daemon consumes three external collaborators:
//!
//! - [`PresenceProbe`] - is a capture device currently active?
//! - [`CalendarProvider`] - which events fall in a time window?
//! - [`Actuator`] - run a named action
//!
//! Their concrete OS bindings live outside this workspace; the [`command`]
//! module adapts any executable (shell script, Shortcuts, `osascript`, ...)
//! to these traits.
//!
//! ```text
//!  probe script      calendar script       action script
//!       │                  │                     │
//!       ▼                  ▼                     ▼
//! ┌────────────┐  ┌─────────────────┐   ┌─────────────────┐
//! │CommandProbe│  │ CommandCalendar │   │ CommandActuator │
//! └─────┬──────┘  └───────┬─────────┘   └────────┬────────┘
//!       │                 │ RawEvent → normalize │
//!       ▼                 ▼                      ▼
//!  PresenceProbe   CalendarProvider           Actuator
//! ```

pub mod command;
pub mod error;
pub mod provider;
pub mod raw_event;

pub use command::{CommandActuator, CommandCalendar, CommandProbe, CommandSpec};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{Actuator, BoxFuture, CalendarProvider, DisabledCalendar, PresenceProbe};
pub use raw_event::{RawAttendees, RawEvent, normalize_event, normalize_events};
