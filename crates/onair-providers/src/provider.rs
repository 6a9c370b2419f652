//! Collaborator trait definitions.
//!
//! These traits are the seams between the decision engine and the outside
//! world. They are object-safe so the daemon can hold them as trait objects
//! and tests can substitute in-memory fakes.

use std::future::Future;
use std::pin::Pin;

use onair_core::{CalendarEvent, TimeWindow};

use crate::error::{ProviderError, ProviderResult};

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe for dynamic dispatch.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reports whether a capture device is currently in use.
///
/// Implementations should be side-effect free and answer within
/// milliseconds; the daemon calls this on every poll tick.
pub trait PresenceProbe: Send + Sync {
    /// Returns a short name for logs (e.g. "command").
    fn name(&self) -> &str;

    /// Returns the raw, undebounced presence reading.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the device state cannot be read; the
    /// daemon skips the tick in that case.
    fn is_active(&self) -> BoxFuture<'_, ProviderResult<bool>>;
}

/// Lists calendar events.
pub trait CalendarProvider: Send + Sync {
    /// Returns a short name for logs.
    fn name(&self) -> &str;

    /// Lists events starting inside `window`.
    ///
    /// Providers may return events slightly outside the window; callers
    /// filter by start time themselves.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` when the calendar is unavailable.
    fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>>;
}

/// Executes named actions.
///
/// Calls may take several seconds and may fail transiently; the dispatcher
/// serializes and retries them.
pub trait Actuator: Send + Sync {
    /// Returns a short name for logs.
    fn name(&self) -> &str;

    /// Runs the action called `action`.
    fn run<'a>(&'a self, action: &'a str) -> BoxFuture<'a, ProviderResult<()>>;
}

/// A calendar provider for setups without a calendar.
///
/// Every listing fails as unavailable, so meeting scans are skipped.
#[derive(Debug, Default)]
pub struct DisabledCalendar;

impl CalendarProvider for DisabledCalendar {
    fn name(&self) -> &str {
        "disabled"
    }

    fn list_events(&self, _window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async {
            Err(ProviderError::unavailable("no calendar configured").with_provider("disabled"))
        })
    }
}
