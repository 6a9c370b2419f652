//! Daemon configuration.
//!
//! All values are fixed at start; there is no live reconfiguration.

use std::path::PathBuf;
use std::time::Duration;

use onair_core::DebounceConfig;

use crate::error::{ServerError, ServerResult};
use crate::lockfile::default_lock_path;
use crate::store::default_state_path;

/// Names of the actions sent to the actuator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionNames {
    /// Sent when presence is confirmed active.
    pub active: String,
    /// Sent when presence is confirmed inactive.
    pub inactive: String,
    /// Sent when a meeting is about to start.
    pub warning: String,
    /// Sent when a warned meeting was never joined.
    pub cancel_warning: String,
}

impl Default for ActionNames {
    fn default() -> Self {
        Self {
            active: "on".to_string(),
            inactive: "off".to_string(),
            warning: "warning".to_string(),
            cancel_warning: "cancel-warning".to_string(),
        }
    }
}

/// Meeting scanner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// How far ahead a meeting may start and still be warned about. Also the
    /// delay after start at which an unjoined warning expires.
    pub warning_window: Duration,
    /// How long warned ids are remembered after their meeting started.
    pub cleanup_horizon: Duration,
    /// Extra conference-link substrings on top of the built-in list.
    pub extra_patterns: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            warning_window: Duration::from_secs(5 * 60),
            cleanup_horizon: Duration::from_secs(60 * 60),
            extra_patterns: Vec::new(),
        }
    }
}

/// Action dispatcher configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Additional attempts after a failed action.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_delay: Duration::from_secs(3),
        }
    }
}

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Presence poll period.
    pub poll_interval: Duration,
    /// Run the meeting scan every this many ticks.
    pub scan_every_ticks: u32,
    /// Presence debounce parameters.
    pub debounce: DebounceConfig,
    /// Meeting scanner parameters.
    pub scan: ScanConfig,
    /// Action dispatcher parameters.
    pub dispatch: DispatchConfig,
    /// Action names.
    pub actions: ActionNames,
    /// Path to the tracker state file.
    pub state_path: PathBuf,
    /// Path to the instance lock file.
    pub lock_path: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            scan_every_ticks: 15,
            debounce: DebounceConfig::default(),
            scan: ScanConfig::default(),
            dispatch: DispatchConfig::default(),
            actions: ActionNames::default(),
            state_path: default_state_path(),
            lock_path: default_lock_path(),
        }
    }
}

impl DaemonConfig {
    /// Builder: set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Builder: set the scan cadence in ticks.
    pub fn with_scan_every_ticks(mut self, ticks: u32) -> Self {
        self.scan_every_ticks = ticks;
        self
    }

    /// Builder: set debounce parameters.
    pub fn with_debounce(mut self, debounce: DebounceConfig) -> Self {
        self.debounce = debounce;
        self
    }

    /// Builder: set the warning window.
    pub fn with_warning_window(mut self, window: Duration) -> Self {
        self.scan.warning_window = window;
        self
    }

    /// Builder: set the cleanup horizon.
    pub fn with_cleanup_horizon(mut self, horizon: Duration) -> Self {
        self.scan.cleanup_horizon = horizon;
        self
    }

    /// Builder: set extra conference patterns.
    pub fn with_extra_patterns(mut self, patterns: Vec<String>) -> Self {
        self.scan.extra_patterns = patterns;
        self
    }

    /// Builder: set retry parameters.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.dispatch = DispatchConfig {
            max_retries,
            retry_delay,
        };
        self
    }

    /// Builder: set action names.
    pub fn with_actions(mut self, actions: ActionNames) -> Self {
        self.actions = actions;
        self
    }

    /// Builder: set the state file path.
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = path.into();
        self
    }

    /// Builder: set the lock file path.
    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = path.into();
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> ServerResult<()> {
        if self.poll_interval.is_zero() {
            return Err(ServerError::config("poll interval must be greater than zero"));
        }
        if self.scan_every_ticks == 0 {
            return Err(ServerError::config("scan cadence must be at least one tick"));
        }
        if self.scan.warning_window.is_zero() {
            return Err(ServerError::config("warning window must be greater than zero"));
        }
        if self.scan.cleanup_horizon < self.scan.warning_window {
            return Err(ServerError::config(
                "cleanup horizon must not be shorter than the warning window",
            ));
        }
        let names = [
            ("active", &self.actions.active),
            ("inactive", &self.actions.inactive),
            ("warning", &self.actions.warning),
            ("cancel_warning", &self.actions.cancel_warning),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(ServerError::config(format!("action name `{key}` is empty")));
            }
        }
        Ok(())
    }
}
