//! Command-backed collaborators.
//!
//! Each adapter runs an external program with a bounded timeout:
//!
//! - [`CommandProbe`] prints `true`/`false` (or `1`/`0`, `on`/`off`, ...)
//! - [`CommandCalendar`] receives the window start and end (RFC 3339) as
//!   trailing arguments and prints a JSON array of [`RawEvent`]s
//! - [`CommandActuator`] receives the action name as its last argument

use std::process::Output;
use std::time::{Duration, Instant};

use chrono::SecondsFormat;
use tokio::process::Command;
use tracing::{debug, trace};

use onair_core::{CalendarEvent, TimeWindow};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{Actuator, BoxFuture, CalendarProvider, PresenceProbe};
use crate::raw_event::{RawEvent, normalize_events};

/// A program plus its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSpec {
    /// Default time a command may run before it is killed.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Builds a spec from an argv-style list (`["osascript", "-e", "..."]`).
    pub fn from_argv<I, S>(argv: I) -> ProviderResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = argv.into_iter().map(Into::into);
        let program = argv
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ProviderError::configuration("empty command"))?;
        Ok(Self {
            program,
            args: argv.collect(),
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Builder: set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the command with `extra` appended and returns its output.
    ///
    /// A non-zero exit status is reported as [`ProviderError::command_failed`].
    async fn output(&self, extra: &[&str]) -> ProviderResult<Output> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).args(extra).kill_on_drop(true);

        trace!(program = %self.program, extra = ?extra, "Running command");

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ProviderError::unavailable(format!(
                    "failed to run `{}`",
                    self.program
                ))
                .with_source(e));
            }
            Err(_) => {
                return Err(ProviderError::timeout(format!(
                    "`{}` did not finish within {}s",
                    self.program,
                    self.timeout.as_secs_f32()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProviderError::command_failed(format!(
                "`{}` failed ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

/// Parses a probe's stdout into a presence reading.
fn parse_presence(stdout: &str) -> ProviderResult<bool> {
    match stdout.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "active" => Ok(true),
        "false" | "0" | "no" | "off" | "inactive" | "" => Ok(false),
        other => Err(ProviderError::invalid_response(format!(
            "unexpected probe output: {other}"
        ))),
    }
}

/// Presence probe backed by a command.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    spec: CommandSpec,
}

impl CommandProbe {
    /// Creates a probe running `spec`.
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl PresenceProbe for CommandProbe {
    fn name(&self) -> &str {
        "command"
    }

    fn is_active(&self) -> BoxFuture<'_, ProviderResult<bool>> {
        Box::pin(async move {
            let output = self
                .spec
                .output(&[])
                .await
                .map_err(|e| e.with_provider("probe"))?;
            parse_presence(&String::from_utf8_lossy(&output.stdout))
                .map_err(|e| e.with_provider("probe"))
        })
    }
}

/// Calendar provider backed by a command printing JSON events.
#[derive(Debug, Clone)]
pub struct CommandCalendar {
    spec: CommandSpec,
    owner: Option<String>,
}

impl CommandCalendar {
    /// Creates a calendar provider running `spec`.
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec, owner: None }
    }

    /// Builder: set the owner's address, excluded from attendee lists.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }
}

impl CalendarProvider for CommandCalendar {
    fn name(&self) -> &str {
        "command"
    }

    fn list_events(&self, window: TimeWindow) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            let start = window.start.to_rfc3339_opts(SecondsFormat::Secs, true);
            let end = window.end.to_rfc3339_opts(SecondsFormat::Secs, true);
            let output = self
                .spec
                .output(&[start.as_str(), end.as_str()])
                .await
                .map_err(|e| e.with_provider("calendar"))?;

            let raws: Vec<RawEvent> = serde_json::from_slice(&output.stdout).map_err(|e| {
                ProviderError::invalid_response("calendar output is not a JSON event list")
                    .with_provider("calendar")
                    .with_source(e)
            })?;

            let events = normalize_events(&raws, self.owner.as_deref());
            debug!(count = events.len(), %start, %end, "Listed calendar events");
            Ok(events)
        })
    }
}

/// Actuator backed by a command receiving the action name.
#[derive(Debug, Clone)]
pub struct CommandActuator {
    spec: CommandSpec,
}

impl CommandActuator {
    /// Creates an actuator running `spec`.
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl Actuator for CommandActuator {
    fn name(&self) -> &str {
        "command"
    }

    fn run<'a>(&'a self, action: &'a str) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            let started = Instant::now();
            self.spec
                .output(&[action])
                .await
                .map_err(|e| e.with_provider("actuator"))?;
            trace!(
                action,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Action command finished"
            );
            Ok(())
        })
    }
}
