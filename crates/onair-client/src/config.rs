//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/onair/config.toml` by default. Every key is optional.
//!
//! ```toml
//! [daemon]
//! poll_interval_secs = 2
//! warning_window_secs = 300
//!
//! [commands]
//! probe = ["/usr/local/bin/camera-active"]
//! calendar = ["/usr/local/bin/agenda", "--json"]
//! actuator = ["/usr/local/bin/on-air-light"]
//!
//! [meetings]
//! extra_patterns = ["meet.example.org"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use onair_core::DebounceConfig;
use onair_providers::CommandSpec;
use onair_server::{ActionNames, DaemonConfig, default_lock_path, default_state_path};

use crate::error::{ClientError, ClientResult};

/// Configuration for the onair client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timing settings.
    pub daemon: DaemonSettings,

    /// Action names passed to the actuator.
    pub actions: ActionSettings,

    /// External commands.
    pub commands: CommandSettings,

    /// Meeting detection settings.
    pub meetings: MeetingSettings,

    /// File locations.
    pub paths: PathSettings,

    /// File this configuration was read from.
    #[serde(skip)]
    source: Option<PathBuf>,
}

/// Timing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Presence poll period in seconds.
    pub poll_interval_secs: u64,

    /// Scan the calendar every this many polls.
    pub scan_every_ticks: u32,

    /// Consistent readings needed to confirm a presence change.
    pub debounce_threshold: u32,

    /// Seconds after which a persisting reading is confirmed regardless.
    pub debounce_timeout_secs: u64,

    /// How far ahead meetings are warned about, in seconds.
    pub warning_window_secs: u64,

    /// How long warned meetings are remembered, in seconds.
    pub cleanup_horizon_secs: u64,

    /// Extra attempts after a failed action.
    pub max_retries: u32,

    /// Seconds between action attempts.
    pub retry_delay_secs: u64,

    /// Seconds an external command may run before it is killed.
    pub command_timeout_secs: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        let daemon = DaemonConfig::default();
        Self {
            poll_interval_secs: daemon.poll_interval.as_secs(),
            scan_every_ticks: daemon.scan_every_ticks,
            debounce_threshold: daemon.debounce.threshold,
            debounce_timeout_secs: daemon.debounce.timeout.as_secs(),
            warning_window_secs: daemon.scan.warning_window.as_secs(),
            cleanup_horizon_secs: daemon.scan.cleanup_horizon.as_secs(),
            max_retries: daemon.dispatch.max_retries,
            retry_delay_secs: daemon.dispatch.retry_delay.as_secs(),
            command_timeout_secs: CommandSpec::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Action names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSettings {
    /// Sent when presence turns on.
    pub active: String,

    /// Sent when presence turns off.
    pub inactive: String,

    /// Sent shortly before a meeting.
    pub warning: String,

    /// Sent when a warned meeting was not joined.
    pub cancel_warning: String,
}

impl Default for ActionSettings {
    fn default() -> Self {
        let names = ActionNames::default();
        Self {
            active: names.active,
            inactive: names.inactive,
            warning: names.warning,
            cancel_warning: names.cancel_warning,
        }
    }
}

impl From<&ActionSettings> for ActionNames {
    fn from(settings: &ActionSettings) -> Self {
        Self {
            active: settings.active.clone(),
            inactive: settings.inactive.clone(),
            warning: settings.warning.clone(),
            cancel_warning: settings.cancel_warning.clone(),
        }
    }
}

/// External command lines, argv style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    /// Prints whether a capture device is active.
    pub probe: Vec<String>,

    /// Prints calendar events as JSON. Meeting scans are disabled when empty.
    pub calendar: Vec<String>,

    /// Runs a named action.
    pub actuator: Vec<String>,

    /// Attendee entry that identifies the calendar owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_owner: Option<String>,
}

/// Meeting detection settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingSettings {
    /// Conference link substrings recognized on top of the built-in list.
    pub extra_patterns: Vec<String>,
}

/// File locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Tracker state file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<PathBuf>,

    /// Instance lock file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<PathBuf>,
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Returns the file this configuration was read from, or the default
    /// path when it came from defaults.
    pub fn source_path(&self) -> PathBuf {
        self.source.clone().unwrap_or_else(Self::default_path)
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("onair")
    }

    /// Returns the state file path, honoring the override.
    pub fn state_path(&self) -> PathBuf {
        self.paths.state.clone().unwrap_or_else(default_state_path)
    }

    /// Returns the lock file path, honoring the override.
    pub fn lock_path(&self) -> PathBuf {
        self.paths.lock.clone().unwrap_or_else(default_lock_path)
    }

    /// Builds the daemon configuration.
    pub fn daemon_config(&self) -> ClientResult<DaemonConfig> {
        let d = &self.daemon;
        let config = DaemonConfig::default()
            .with_poll_interval(Duration::from_secs(d.poll_interval_secs))
            .with_scan_every_ticks(d.scan_every_ticks)
            .with_debounce(DebounceConfig::new(
                d.debounce_threshold,
                Duration::from_secs(d.debounce_timeout_secs),
            ))
            .with_warning_window(Duration::from_secs(d.warning_window_secs))
            .with_cleanup_horizon(Duration::from_secs(d.cleanup_horizon_secs))
            .with_retries(d.max_retries, Duration::from_secs(d.retry_delay_secs))
            .with_actions(ActionNames::from(&self.actions))
            .with_extra_patterns(self.meetings.extra_patterns.clone())
            .with_state_path(self.state_path())
            .with_lock_path(self.lock_path());

        config
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Returns the presence probe command.
    pub fn probe_command(&self) -> ClientResult<CommandSpec> {
        self.required_command("probe", &self.commands.probe)
    }

    /// Returns the actuator command.
    pub fn actuator_command(&self) -> ClientResult<CommandSpec> {
        self.required_command("actuator", &self.commands.actuator)
    }

    /// Returns the calendar command, if one is configured.
    pub fn calendar_command(&self) -> ClientResult<Option<CommandSpec>> {
        if self.commands.calendar.is_empty() {
            return Ok(None);
        }
        self.command_spec(&self.commands.calendar).map(Some)
    }

    fn required_command(&self, key: &str, argv: &[String]) -> ClientResult<CommandSpec> {
        if argv.is_empty() {
            return Err(ClientError::Config(format!(
                "[commands] {key} is not set in {}",
                self.source_path().display()
            )));
        }
        self.command_spec(argv)
            .map_err(|e| ClientError::Config(format!("[commands] {key}: {e}")))
    }

    fn command_spec(&self, argv: &[String]) -> ClientResult<CommandSpec> {
        let timeout = Duration::from_secs(self.daemon.command_timeout_secs);
        if timeout.is_zero() {
            return Err(ClientError::Config(
                "command_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(CommandSpec::from_argv(argv.iter().cloned())?.with_timeout(timeout))
    }
}
