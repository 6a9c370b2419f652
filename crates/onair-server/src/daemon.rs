//! The orchestration loop.
//!
//! Polls the presence probe on a fixed tick, feeds the debouncer, and turns
//! confirmed transitions into exclusive actions. Every few ticks it asks the
//! meeting scanner for warning and cancel-warning actions. The dispatcher
//! worker runs alongside as a separate task.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use onair_core::Debouncer;
use onair_providers::{Actuator, CalendarProvider, PresenceProbe};

use crate::config::DaemonConfig;
use crate::dispatcher::{ActionDispatcher, ActionRequest};
use crate::error::ServerResult;
use crate::scanner::MeetingScanner;
use crate::signals::ShutdownSignal;
use crate::store::StateStore;

/// The presence-and-schedule monitor.
pub struct Daemon {
    config: DaemonConfig,
    probe: Box<dyn PresenceProbe>,
    calendar: Box<dyn CalendarProvider>,
    actuator: Arc<dyn Actuator>,
    debouncer: Debouncer,
    scanner: MeetingScanner,
    dispatcher: ActionDispatcher,
}

impl Daemon {
    /// Validates `config`, loads the saved tracker state, and wires the
    /// collaborators together.
    pub fn new(
        config: DaemonConfig,
        probe: Box<dyn PresenceProbe>,
        calendar: Box<dyn CalendarProvider>,
        actuator: Arc<dyn Actuator>,
    ) -> ServerResult<Self> {
        config.validate()?;

        let scanner = MeetingScanner::load(
            &config.scan,
            config.actions.clone(),
            StateStore::new(&config.state_path),
        )?;
        let debouncer = Debouncer::new(config.debounce);
        let dispatcher = ActionDispatcher::new(config.dispatch);

        Ok(Self {
            config,
            probe,
            calendar,
            actuator,
            debouncer,
            scanner,
            dispatcher,
        })
    }

    /// Runs until `shutdown` fires, then saves the tracker state.
    ///
    /// An actuator call still in flight at shutdown is not waited for.
    pub async fn run(self, shutdown: ShutdownSignal) -> ServerResult<()> {
        let Self {
            config,
            probe,
            calendar,
            actuator,
            mut debouncer,
            mut scanner,
            dispatcher,
        } = self;

        let dispatch = dispatcher.handle();
        tokio::spawn(dispatcher.run(actuator, shutdown.clone()));

        info!(
            probe = probe.name(),
            calendar = calendar.name(),
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            scan_every_ticks = config.scan_every_ticks,
            "Daemon started"
        );

        let mut interval = tokio::time::interval(config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut tick: u64 = 0;
        let mut probe_failing = false;
        let mut wait = std::pin::pin!(shutdown.wait());

        loop {
            tokio::select! {
                _ = &mut wait => {
                    info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => {}
            }

            match probe.is_active().await {
                Ok(raw) => {
                    if probe_failing {
                        info!(probe = probe.name(), "Presence probe recovered");
                        probe_failing = false;
                    }
                    if let Some(transition) = debouncer.observe(raw, Instant::now().into_std()) {
                        let name = if transition.to {
                            &config.actions.active
                        } else {
                            &config.actions.inactive
                        };
                        info!(active = transition.to, action = %name, "Presence changed");
                        dispatch.submit(ActionRequest::exclusive(name));
                        scanner.presence_changed(transition.to);
                    }
                }
                Err(e) if !probe_failing => {
                    warn!(probe = probe.name(), error = %e, "Presence probe failed, skipping tick");
                    probe_failing = true;
                }
                Err(e) => {
                    debug!(probe = probe.name(), error = %e, "Presence probe still failing");
                }
            }

            if tick % u64::from(config.scan_every_ticks) == 0 {
                let now = Utc::now();
                let present = debouncer.confirmed();
                for request in scanner.scan(now, present, calendar.as_ref()).await {
                    dispatch.submit(request);
                }
                if let Some(request) = scanner.check_expiration(now, present) {
                    dispatch.submit(request);
                }
            }
            tick = tick.wrapping_add(1);
        }

        scanner.persist();
        info!(ticks = tick, "Daemon stopped");
        Ok(())
    }
}
