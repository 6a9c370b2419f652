//! Debouncing for the raw presence signal.
//!
//! The presence probe is polled every tick and can flap for a reading or two
//! when a capture device is opened or released. [`Debouncer`] turns those raw
//! reads into a stable confirmed value.
//!
//! # State Machine
//!
//! ```text
//!               raw != confirmed                count >= threshold
//!   Stable(v) ──────────────────► Pending(!v) ──────────────────────► Stable(!v)
//!       ▲                            │   │        or elapsed >= timeout
//!       │       raw == confirmed     │   │
//!       └────────────────────────────┘   └─ raw == pending: count += 1
//! ```
//!
//! A transition is confirmed when the opposite reading has been seen
//! `threshold` times in a row, or when `timeout` has elapsed since the first
//! opposite reading, whichever comes first.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Debounce parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Consecutive opposite readings needed to confirm.
    pub threshold: u32,
    /// Time since the first opposite reading after which it is confirmed.
    pub timeout: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            timeout: Duration::from_secs(10),
        }
    }
}

impl DebounceConfig {
    /// Creates a debounce config.
    pub fn new(threshold: u32, timeout: Duration) -> Self {
        Self { threshold, timeout }
    }
}

/// A confirmed change of the presence value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The newly confirmed value.
    pub to: bool,
}

/// Turns a noisy boolean signal into confirmed transitions.
#[derive(Debug, Clone)]
pub struct Debouncer {
    config: DebounceConfig,
    confirmed: bool,
    pending: Option<bool>,
    consistent_count: u32,
    pending_since: Option<Instant>,
}

impl Debouncer {
    /// Creates a debouncer in the `Stable(false)` state.
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            confirmed: false,
            pending: None,
            consistent_count: 0,
            pending_since: None,
        }
    }

    /// Returns the currently confirmed value.
    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    /// Returns the value awaiting confirmation, if any.
    pub fn pending(&self) -> Option<bool> {
        self.pending
    }

    /// Returns how many consecutive readings agree with the pending value.
    pub fn consistent_count(&self) -> u32 {
        self.consistent_count
    }

    /// Feeds one raw reading taken at `now`.
    ///
    /// Returns the transition if this reading confirms one.
    pub fn observe(&mut self, raw: bool, now: Instant) -> Option<Transition> {
        if raw == self.confirmed {
            if self.pending.is_some() {
                trace!(value = raw, "Pending presence change withdrawn");
            }
            self.clear_pending();
            return None;
        }

        match self.pending {
            Some(value) if value == raw => {
                self.consistent_count = self.consistent_count.saturating_add(1);
            }
            _ => {
                self.pending = Some(raw);
                self.consistent_count = 1;
                self.pending_since = Some(now);
            }
        }

        let by_count = self.consistent_count >= self.config.threshold;
        let by_timeout = self
            .pending_since
            .is_some_and(|since| now.saturating_duration_since(since) >= self.config.timeout);

        if !(by_count || by_timeout) {
            trace!(
                value = raw,
                count = self.consistent_count,
                threshold = self.config.threshold,
                "Presence change pending"
            );
            return None;
        }

        debug!(
            to = raw,
            count = self.consistent_count,
            by_timeout = by_timeout && !by_count,
            "Presence change confirmed"
        );
        self.confirmed = raw;
        self.clear_pending();
        Some(Transition { to: raw })
    }

    fn clear_pending(&mut self) {
        self.pending = None;
        self.consistent_count = 0;
        self.pending_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> Debouncer {
        Debouncer::new(DebounceConfig::default())
    }

    #[test]
    fn starts_stable_false() {
        let d = debouncer();
        assert!(!d.confirmed());
        assert!(d.pending().is_none());
    }

    #[test]
    fn single_outlier_is_rejected() {
        let mut d = debouncer();
        let t0 = Instant::now();
        assert_eq!(d.observe(true, t0), None);
        assert_eq!(d.observe(false, t0 + Duration::from_millis(500)), None);
        assert!(!d.confirmed());
        assert!(d.pending().is_none());
        assert_eq!(d.consistent_count(), 0);
    }

    #[test]
    fn confirms_on_second_consistent_reading() {
        let readings = [false, false, true, false, true, true];
        let mut d = debouncer();
        let t0 = Instant::now();

        let transitions: Vec<(usize, Transition)> = readings
            .iter()
            .enumerate()
            .filter_map(|(i, &raw)| {
                d.observe(raw, t0 + Duration::from_millis(500 * i as u64))
                    .map(|t| (i, t))
            })
            .collect();

        assert_eq!(transitions, vec![(5, Transition { to: true })]);
        assert!(d.confirmed());
    }

    #[test]
    fn confirms_after_timeout() {
        let mut d = Debouncer::new(DebounceConfig::new(5, Duration::from_secs(10)));
        let t0 = Instant::now();
        assert_eq!(d.observe(true, t0), None);
        assert_eq!(d.observe(true, t0 + Duration::from_secs(4)), None);
        assert_eq!(
            d.observe(true, t0 + Duration::from_secs(10)),
            Some(Transition { to: true })
        );
        assert!(d.pending().is_none());
    }

    #[test]
    fn count_and_timeout_together_confirm_once() {
        let mut d = Debouncer::new(DebounceConfig::new(2, Duration::from_secs(1)));
        let t0 = Instant::now();
        assert_eq!(d.observe(true, t0), None);
        assert_eq!(
            d.observe(true, t0 + Duration::from_secs(5)),
            Some(Transition { to: true })
        );
        assert_eq!(d.observe(true, t0 + Duration::from_secs(6)), None);
    }

    #[test]
    fn confirms_off_after_on() {
        let mut d = debouncer();
        let t0 = Instant::now();
        d.observe(true, t0);
        d.observe(true, t0);
        assert!(d.confirmed());

        assert_eq!(d.observe(false, t0 + Duration::from_secs(1)), None);
        assert_eq!(
            d.observe(false, t0 + Duration::from_secs(2)),
            Some(Transition { to: false })
        );
    }

    #[test]
    fn threshold_of_one_confirms_immediately() {
        let mut d = Debouncer::new(DebounceConfig::new(1, Duration::from_secs(10)));
        assert_eq!(
            d.observe(true, Instant::now()),
            Some(Transition { to: true })
        );
    }

    #[test]
    fn withdrawn_change_restarts_timeout() {
        let mut d = Debouncer::new(DebounceConfig::new(10, Duration::from_secs(10)));
        let t0 = Instant::now();
        d.observe(true, t0);
        d.observe(false, t0 + Duration::from_secs(6));
        // Timer restarted at t0+8, so t0+12 is only 4s into the new pending.
        assert_eq!(d.observe(true, t0 + Duration::from_secs(8)), None);
        assert_eq!(d.observe(true, t0 + Duration::from_secs(12)), None);
        assert_eq!(
            d.observe(true, t0 + Duration::from_secs(18)),
            Some(Transition { to: true })
        );
    }
}
