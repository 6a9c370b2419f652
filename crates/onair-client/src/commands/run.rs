//! Run command: starts the monitor in the foreground.
//!
//! Wires the components together:
//! - Instance lock (prevents duplicate monitors)
//! - Signal handler (SIGTERM/SIGINT for shutdown)
//! - Command-backed probe, calendar and actuator from config
//! - The daemon loop and its dispatcher worker

use std::sync::Arc;

use tracing::info;

use onair_providers::{
    Actuator, CalendarProvider, CommandActuator, CommandCalendar, CommandProbe, DisabledCalendar,
    PresenceProbe,
};
use onair_server::{Daemon, InstanceLock, SignalHandler};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Runs the monitor until SIGTERM/SIGINT.
///
/// The instance lock is held for the whole run and released on every exit
/// path, including errors after acquisition.
pub async fn run(config: &ClientConfig) -> ClientResult<()> {
    let daemon_config = config.daemon_config()?;
    let (probe, calendar, actuator) = build_collaborators(config)?;

    let mut lock = InstanceLock::acquire(&daemon_config.lock_path)?;

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener()?;

    let daemon = Daemon::new(daemon_config, probe, calendar, actuator)?;
    let result = daemon.run(signal_handler.shutdown()).await;

    lock.release();
    result?;
    info!("Monitor stopped");
    Ok(())
}

type Collaborators = (
    Box<dyn PresenceProbe>,
    Box<dyn CalendarProvider>,
    Arc<dyn Actuator>,
);

/// Builds the command-backed collaborators from configuration.
fn build_collaborators(config: &ClientConfig) -> ClientResult<Collaborators> {
    let probe = CommandProbe::new(config.probe_command()?);
    let actuator = CommandActuator::new(config.actuator_command()?);

    let calendar: Box<dyn CalendarProvider> = match config.calendar_command()? {
        Some(spec) => {
            let mut calendar = CommandCalendar::new(spec);
            if let Some(owner) = &config.commands.calendar_owner {
                calendar = calendar.with_owner(owner);
            }
            Box::new(calendar)
        }
        None => {
            info!("No calendar command configured, meeting warnings disabled");
            Box::new(DisabledCalendar)
        }
    };

    Ok((Box::new(probe), calendar, Arc::new(actuator)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collaborators_need_probe_and_actuator() {
        let config = ClientConfig::default();
        assert!(build_collaborators(&config).is_err());
    }

    #[test]
    fn calendar_falls_back_to_disabled() {
        let mut config = ClientConfig::default();
        config.commands.probe = vec!["true".into()];
        config.commands.actuator = vec!["true".into()];

        let (probe, calendar, actuator) = build_collaborators(&config).unwrap();
        assert_eq!(probe.name(), "command");
        assert_eq!(calendar.name(), "disabled");
        assert_eq!(actuator.name(), "command");
    }

    #[test]
    fn calendar_command_is_used_when_set() {
        let mut config = ClientConfig::default();
        config.commands.probe = vec!["true".into()];
        config.commands.actuator = vec!["true".into()];
        config.commands.calendar = vec!["agenda".into()];

        let (_, calendar, _) = build_collaborators(&config).unwrap();
        assert_ne!(calendar.name(), "disabled");
    }
}
