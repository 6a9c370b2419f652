//! Serial, coalescing action dispatcher.
//!
//! Producers submit actions into a single pending slot; one background
//! worker takes whatever is in the slot and runs it through the
//! [`Actuator`], retrying failures a bounded number of times.
//!
//! - **Exclusive** actions describe a terminal desired state and always
//!   overwrite the slot: the latest desired state wins.
//! - **Advisory** actions only fill an empty slot and are dropped otherwise,
//!   so they never displace or queue behind an exclusive action.
//!
//! Because the slot holds at most one action, bursts of submissions collapse
//! into the most recent one instead of building a backlog.

use std::fmt;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use onair_providers::Actuator;

use crate::config::DispatchConfig;
use crate::signals::ShutdownSignal;

/// How a submitted action interacts with the pending slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionClass {
    /// Terminal desired state; replaces whatever is pending.
    Exclusive,
    /// Notification; only fills an empty slot.
    Advisory,
}

/// A named action with its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Name passed to the actuator.
    pub name: String,
    /// Coalescing class.
    pub class: ActionClass,
}

impl ActionRequest {
    /// Creates an exclusive action.
    pub fn exclusive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: ActionClass::Exclusive,
        }
    }

    /// Creates an advisory action.
    pub fn advisory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: ActionClass::Advisory,
        }
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// What happened to a submitted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The slot was empty; the worker was woken.
    Queued,
    /// An exclusive action replaced the pending one.
    Replaced { previous: ActionRequest },
    /// An advisory action was dropped because the slot was occupied.
    Skipped { pending: ActionRequest },
}

#[derive(Debug, Default)]
struct Shared {
    slot: Mutex<Option<ActionRequest>>,
    wake: Notify,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Option<ActionRequest>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> Option<ActionRequest> {
        self.slot().take()
    }
}

/// The dispatcher and its worker loop.
pub struct ActionDispatcher {
    config: DispatchConfig,
    shared: Arc<Shared>,
}

impl ActionDispatcher {
    /// Creates a dispatcher with an empty slot.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
        }
    }

    /// Returns a handle for submitting actions.
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            shared: self.shared.clone(),
        }
    }

    /// Runs the worker until `shutdown` fires.
    ///
    /// An actuator call in progress is finished before shutdown is noticed.
    pub async fn run(self, actuator: Arc<dyn Actuator>, shutdown: ShutdownSignal) {
        info!(
            actuator = actuator.name(),
            max_retries = self.config.max_retries,
            retry_delay_ms = self.config.retry_delay.as_millis() as u64,
            "Action dispatcher started"
        );

        let mut shutdown = pin!(shutdown.wait());
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.shared.wake.notified() => {}
            }

            while let Some(request) = self.shared.take() {
                self.execute(actuator.as_ref(), &request).await;
            }
        }

        debug!("Action dispatcher stopped");
    }

    /// Runs one action, retrying transient failures.
    async fn execute(&self, actuator: &dyn Actuator, request: &ActionRequest) {
        let started = Instant::now();
        let attempts = self.config.max_retries.saturating_add(1);

        for attempt in 1..=attempts {
            match actuator.run(&request.name).await {
                Ok(()) => {
                    info!(
                        action = %request,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Action completed"
                    );
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    error!(
                        action = %request,
                        attempt,
                        code = %e.code(),
                        error = %e,
                        "Action failed, not retryable"
                    );
                    return;
                }
                Err(e) if attempt < attempts => {
                    warn!(
                        action = %request,
                        attempt,
                        error = %e,
                        retry_in_ms = self.config.retry_delay.as_millis() as u64,
                        "Action failed, retrying"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        action = %request,
                        attempts,
                        error = %e,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Action failed, giving up"
                    );
                }
            }
        }
    }
}

/// Cloneable handle for submitting actions to a dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    shared: Arc<Shared>,
}

impl DispatchHandle {
    /// Submits an action according to its class.
    ///
    /// Never blocks beyond the slot mutex.
    pub fn submit(&self, request: ActionRequest) -> SubmitOutcome {
        let outcome = {
            let mut slot = self.shared.slot();
            match (slot.as_ref(), request.class) {
                (None, _) => {
                    *slot = Some(request.clone());
                    SubmitOutcome::Queued
                }
                (Some(_), ActionClass::Exclusive) => {
                    let previous = slot.replace(request.clone());
                    match previous {
                        Some(previous) => SubmitOutcome::Replaced { previous },
                        None => SubmitOutcome::Queued,
                    }
                }
                (Some(pending), ActionClass::Advisory) => SubmitOutcome::Skipped {
                    pending: pending.clone(),
                },
            }
        };

        match &outcome {
            SubmitOutcome::Queued => {
                debug!(action = %request, "Action queued");
                self.shared.wake.notify_one();
            }
            SubmitOutcome::Replaced { previous } => {
                debug!(action = %request, replaced = %previous, "Pending action replaced");
            }
            SubmitOutcome::Skipped { pending } => {
                info!(action = %request, pending = %pending, "Skipping advisory action, another action is pending");
            }
        }
        outcome
    }

    /// Returns a copy of the pending action, if any.
    pub fn pending(&self) -> Option<ActionRequest> {
        self.shared.slot().clone()
    }
}
