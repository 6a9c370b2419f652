//! Daemon: instance lock, state store, meeting scanner, action dispatcher.
//!
//! This crate provides the onair monitor that:
//! - Guarantees a single running instance per user
//! - Debounces the presence probe into ON/OFF actions
//! - Warns about qualifying meetings and cancels unjoined warnings
//! - Coalesces and retries actions on a single worker
//! - Persists meeting tracking state across restarts
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use onair_providers::{CommandActuator, CommandProbe, CommandSpec, DisabledCalendar};
//! use onair_server::{Daemon, DaemonConfig, InstanceLock, SignalHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DaemonConfig::default();
//!     let _lock = InstanceLock::acquire(&config.lock_path)?;
//!
//!     let probe = CommandProbe::new(CommandSpec::from_argv(["camera-active"])?);
//!     let actuator = CommandActuator::new(CommandSpec::from_argv(["light"])?);
//!     let daemon = Daemon::new(
//!         config,
//!         Box::new(probe),
//!         Box::new(DisabledCalendar),
//!         Arc::new(actuator),
//!     )?;
//!
//!     let signals = SignalHandler::new();
//!     signals.spawn_listener()?;
//!     daemon.run(signals.shutdown()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod daemon;
mod dispatcher;
mod error;
mod lockfile;
mod scanner;
mod signals;
mod store;

pub use config::{ActionNames, DaemonConfig, DispatchConfig, ScanConfig};
pub use daemon::Daemon;
pub use dispatcher::{ActionClass, ActionDispatcher, ActionRequest, DispatchHandle, SubmitOutcome};
pub use error::{ServerError, ServerResult};
pub use lockfile::{InstanceLock, default_lock_path, is_process_running, read_holder};
pub use scanner::{MeetingRecord, MeetingScanner};
pub use signals::{ShutdownSignal, SignalHandler};
pub use store::{StateStore, TrackerSnapshot, default_state_path};
