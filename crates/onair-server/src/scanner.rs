//! Meeting warn/expire tracker.
//!
//! The scanner looks at upcoming calendar events, warns once per qualifying
//! meeting shortly before it starts, and cancels the warning if nobody joined
//! by the time the meeting is a warning window old. Warned ids are remembered
//! (and persisted) so a restart never re-warns the same meeting.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use onair_core::{MeetingDetector, TimeWindow};
use onair_providers::CalendarProvider;

use crate::config::{ActionNames, ScanConfig};
use crate::dispatcher::ActionRequest;
use crate::error::{ServerError, ServerResult};
use crate::store::{StateStore, TrackerSnapshot};

/// A warned meeting awaiting expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRecord {
    /// Calendar event id.
    pub id: String,
    /// When the meeting starts.
    pub start_time: DateTime<Utc>,
    /// Whether a warning was emitted for it.
    pub warned: bool,
}

/// Tracks warned meetings and produces warning / cancel-warning actions.
#[derive(Debug)]
pub struct MeetingScanner {
    detector: MeetingDetector,
    warning_window: chrono::Duration,
    cleanup_horizon: chrono::Duration,
    actions: ActionNames,
    store: StateStore,
    warned_ids: BTreeSet<String>,
    records: BTreeMap<String, MeetingRecord>,
    in_warning_state: bool,
}

impl MeetingScanner {
    /// Creates a scanner seeded from the snapshot saved in `store`.
    pub fn load(config: &ScanConfig, actions: ActionNames, store: StateStore) -> ServerResult<Self> {
        let snapshot = store.load();
        Self::from_snapshot(config, actions, store, snapshot)
    }

    /// Creates a scanner seeded from `snapshot`.
    pub fn from_snapshot(
        config: &ScanConfig,
        actions: ActionNames,
        store: StateStore,
        snapshot: TrackerSnapshot,
    ) -> ServerResult<Self> {
        let detector = MeetingDetector::with_extra_patterns(&config.extra_patterns)
            .map_err(|e| ServerError::config(format!("invalid meeting pattern: {e}")))?;
        let warning_window = chrono::Duration::from_std(config.warning_window)
            .map_err(|_| ServerError::config("warning window is out of range"))?;
        let cleanup_horizon = chrono::Duration::from_std(config.cleanup_horizon)
            .map_err(|_| ServerError::config("cleanup horizon is out of range"))?;

        let TrackerSnapshot {
            mut warned_ids,
            meeting_start_times,
            in_warning_state,
        } = snapshot;

        let records = meeting_start_times
            .into_iter()
            .map(|(id, start_time)| {
                warned_ids.insert(id.clone());
                let record = MeetingRecord {
                    id: id.clone(),
                    start_time,
                    warned: true,
                };
                (id, record)
            })
            .collect();

        Ok(Self {
            detector,
            warning_window,
            cleanup_horizon,
            actions,
            store,
            warned_ids,
            records,
            in_warning_state,
        })
    }

    /// Returns the persisted projection of the current state.
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            warned_ids: self.warned_ids.clone(),
            meeting_start_times: self
                .records
                .values()
                .map(|r| (r.id.clone(), r.start_time))
                .collect(),
            in_warning_state: self.in_warning_state,
        }
    }

    /// Returns true while a warning is outstanding.
    pub fn in_warning_state(&self) -> bool {
        self.in_warning_state
    }

    /// Returns true if `id` has already been warned about.
    pub fn is_warned(&self, id: &str) -> bool {
        self.warned_ids.contains(id)
    }

    /// Returns the meetings awaiting expiration.
    pub fn records(&self) -> impl Iterator<Item = &MeetingRecord> {
        self.records.values()
    }

    /// Looks for qualifying meetings about to start.
    ///
    /// Does nothing while presence is active or when the calendar cannot be
    /// read. Returns at most one warning action, even when several meetings
    /// enter the window together.
    pub async fn scan(
        &mut self,
        now: DateTime<Utc>,
        presence_active: bool,
        calendar: &dyn CalendarProvider,
    ) -> Vec<ActionRequest> {
        if presence_active {
            debug!("Presence active, skipping meeting scan");
            return Vec::new();
        }

        // The window end is exclusive; a meeting starting exactly one warning
        // window ahead still qualifies.
        let ahead = self.warning_window + chrono::Duration::seconds(1);
        let window = TimeWindow::around(now, self.cleanup_horizon, ahead);
        let events = match calendar.list_events(window).await {
            Ok(events) => events,
            Err(e) => {
                warn!(calendar = calendar.name(), error = %e, "Calendar unavailable, skipping scan");
                return Vec::new();
            }
        };

        let horizon_end = now + self.warning_window;
        let mut changed = false;
        let mut newly_warned = Vec::new();
        let mut observed = HashSet::with_capacity(events.len());

        for event in &events {
            observed.insert(event.id.as_str());

            let Some(start) = event.start_time() else {
                continue;
            };
            if start <= now || start > horizon_end || self.warned_ids.contains(&event.id) {
                continue;
            }
            if !self.detector.is_qualifying_meeting(event) {
                debug!(id = %event.id, title = %event.title, "Not a meeting, ignoring");
                continue;
            }

            info!(
                id = %event.id,
                title = %event.title,
                start = %start,
                pattern = ?self.detector.conference_pattern(event),
                "Meeting starting soon"
            );
            self.warned_ids.insert(event.id.clone());
            self.records.insert(
                event.id.clone(),
                MeetingRecord {
                    id: event.id.clone(),
                    start_time: start,
                    warned: true,
                },
            );
            self.in_warning_state = true;
            newly_warned.push(event.id.clone());
            changed = true;
        }

        if self.collect_garbage(now, &observed) {
            changed = true;
        }
        if changed {
            self.persist();
        }

        if newly_warned.is_empty() {
            Vec::new()
        } else {
            debug!(meetings = ?newly_warned, "Submitting meeting warning");
            vec![ActionRequest::advisory(&self.actions.warning)]
        }
    }

    /// Drops warned ids that were not observed and whose meetings started
    /// longer ago than the cleanup horizon. Returns true if anything changed.
    fn collect_garbage(&mut self, now: DateTime<Utc>, observed: &HashSet<&str>) -> bool {
        let cutoff = now - self.cleanup_horizon;
        let before = (self.warned_ids.len(), self.records.len());

        let records = &self.records;
        self.warned_ids.retain(|id| {
            observed.contains(id.as_str())
                || records.get(id).is_some_and(|r| r.start_time >= cutoff)
        });

        let warned_ids = &self.warned_ids;
        self.records
            .retain(|id, record| warned_ids.contains(id) && record.start_time >= cutoff);

        let after = (self.warned_ids.len(), self.records.len());
        if after != before {
            debug!(
                dropped_ids = before.0 - after.0,
                dropped_records = before.1 - after.1,
                "Pruned old meetings"
            );
        }
        after != before
    }

    /// Cancels an outstanding warning for meetings nobody joined.
    ///
    /// A warned meeting expires once it has been running for a warning window.
    /// Expired ids stay warned so the meeting is never warned about again.
    pub fn check_expiration(
        &mut self,
        now: DateTime<Utc>,
        presence_active: bool,
    ) -> Option<ActionRequest> {
        if !self.in_warning_state || presence_active {
            return None;
        }

        let expired: Vec<String> = self
            .records
            .values()
            .filter(|r| now - r.start_time >= self.warning_window)
            .map(|r| r.id.clone())
            .collect();
        if expired.is_empty() {
            return None;
        }

        info!(meetings = ?expired, "Meeting warning expired");
        for id in &expired {
            self.records.remove(id);
        }
        self.in_warning_state = false;
        self.persist();

        Some(ActionRequest::exclusive(&self.actions.cancel_warning))
    }

    /// Notes a confirmed presence change.
    ///
    /// Joining while warned settles the warning and every meeting awaiting
    /// expiration. Their ids stay warned.
    pub fn presence_changed(&mut self, active: bool) {
        if active && self.in_warning_state {
            debug!(
                settled = self.records.len(),
                "Presence confirmed during warning, clearing warning state"
            );
            self.in_warning_state = false;
            self.records.clear();
            self.persist();
        }
    }

    /// Writes the current state. Failures are logged and otherwise ignored.
    pub fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            warn!(path = %self.store.path().display(), error = %e, "Failed to save state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::TimeZone;
    use onair_core::CalendarEvent;
    use onair_providers::{BoxFuture, ProviderError, ProviderResult};
    use tempfile::{TempDir, tempdir};

    use crate::dispatcher::ActionClass;

    #[derive(Default)]
    struct FakeCalendar {
        events: Mutex<Vec<CalendarEvent>>,
        fail: bool,
        queries: Mutex<Vec<TimeWindow>>,
    }

    impl FakeCalendar {
        fn with_events(events: Vec<CalendarEvent>) -> Self {
            Self {
                events: Mutex::new(events),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn set_events(&self, events: Vec<CalendarEvent>) {
            *self.events.lock().unwrap() = events;
        }
    }

    impl CalendarProvider for FakeCalendar {
        fn name(&self) -> &str {
            "fake"
        }

        fn list_events(
            &self,
            window: TimeWindow,
        ) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
            self.queries.lock().unwrap().push(window);
            let result = if self.fail {
                Err(ProviderError::unavailable("calendar offline"))
            } else {
                Ok(self.events.lock().unwrap().clone())
            };
            Box::pin(async move { result })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    fn minutes(n: i64) -> chrono::Duration {
        chrono::Duration::minutes(n)
    }

    fn zoom(id: &str, start: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent::new(id, start).with_url("https://zoom.us/j/123")
    }

    fn scanner(dir: &TempDir) -> MeetingScanner {
        MeetingScanner::load(
            &ScanConfig::default(),
            ActionNames::default(),
            StateStore::new(dir.path().join("state.json")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn warns_once_for_upcoming_meeting() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::with_events(vec![zoom("m1", now() + minutes(3))]);

        let actions = scanner.scan(now(), false, &calendar).await;
        assert_eq!(actions, vec![ActionRequest::advisory("warning")]);
        assert_eq!(actions[0].class, ActionClass::Advisory);
        assert!(scanner.is_warned("m1"));
        assert!(scanner.in_warning_state());

        let again = scanner.scan(now() + minutes(1), false, &calendar).await;
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn queries_trailing_horizon_and_warning_window() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::default();

        scanner.scan(now(), false, &calendar).await;
        let queries = calendar.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].start, now() - minutes(60));
        assert_eq!(queries[0].end, now() + minutes(5) + chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn ignores_meetings_outside_window() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::with_events(vec![
            zoom("later", now() + minutes(6)),
            zoom("started", now() - minutes(1)),
            zoom("right-now", now()),
        ]);

        assert!(scanner.scan(now(), false, &calendar).await.is_empty());
        assert!(!scanner.in_warning_state());
    }

    #[tokio::test]
    async fn window_edge_is_inclusive() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let edge = now() + minutes(5);
        let calendar = FakeCalendar::with_events(vec![zoom("edge", edge)]);

        assert_eq!(scanner.scan(now(), false, &calendar).await.len(), 1);
        // The query window is half-open, so its end must lie past the edge.
        let query = calendar.queries.lock().unwrap()[0];
        assert!(query.start <= edge && edge < query.end);
    }

    #[tokio::test]
    async fn non_meetings_are_not_warned() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let date = now().date_naive();
        let calendar = FakeCalendar::with_events(vec![
            CalendarEvent::new("focus", now() + minutes(2)).with_title("Focus time"),
            CalendarEvent::all_day("holiday", date).with_url("https://zoom.us/j/1"),
        ]);

        assert!(scanner.scan(now(), false, &calendar).await.is_empty());
        assert!(!scanner.is_warned("focus"));
    }

    #[tokio::test]
    async fn attendees_qualify_without_link() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::with_events(vec![
            CalendarEvent::new("1on1", now() + minutes(2)).with_attendees(1),
        ]);

        assert_eq!(scanner.scan(now(), false, &calendar).await.len(), 1);
    }

    #[tokio::test]
    async fn several_meetings_produce_one_warning() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::with_events(vec![
            zoom("a", now() + minutes(2)),
            zoom("b", now() + minutes(4)),
        ]);

        assert_eq!(scanner.scan(now(), false, &calendar).await.len(), 1);
        assert!(scanner.is_warned("a"));
        assert!(scanner.is_warned("b"));
        assert_eq!(scanner.records().count(), 2);
    }

    #[tokio::test]
    async fn no_scan_while_present() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::with_events(vec![zoom("m1", now() + minutes(3))]);

        assert!(scanner.scan(now(), true, &calendar).await.is_empty());
        assert!(calendar.queries.lock().unwrap().is_empty());
        assert!(!scanner.is_warned("m1"));
    }

    #[tokio::test]
    async fn calendar_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::failing();

        assert!(scanner.scan(now(), false, &calendar).await.is_empty());
        assert!(scanner.snapshot().is_empty());
    }

    #[tokio::test]
    async fn unjoined_warning_expires() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let start = now() + minutes(3);
        let calendar = FakeCalendar::with_events(vec![zoom("m1", start)]);
        scanner.scan(now(), false, &calendar).await;

        assert!(scanner.check_expiration(start + minutes(4), false).is_none());
        assert!(scanner.check_expiration(start + minutes(5), true).is_none());

        let cancel = scanner.check_expiration(start + minutes(5), false);
        assert_eq!(cancel, Some(ActionRequest::exclusive("cancel-warning")));
        assert!(!scanner.in_warning_state());
        assert_eq!(scanner.records().count(), 0);
        assert!(scanner.is_warned("m1"));

        // The meeting is still listed but never warned again.
        let later = start + minutes(6);
        assert!(scanner.scan(later, false, &calendar).await.is_empty());
        assert!(scanner.check_expiration(later, false).is_none());
    }

    #[tokio::test]
    async fn joining_clears_warning_state() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let start = now() + minutes(3);
        let calendar = FakeCalendar::with_events(vec![zoom("m1", start)]);
        scanner.scan(now(), false, &calendar).await;

        scanner.presence_changed(true);
        assert!(!scanner.in_warning_state());
        assert_eq!(scanner.records().count(), 0);
        assert!(scanner.is_warned("m1"));
        assert!(scanner.check_expiration(start + minutes(10), false).is_none());

        let saved = StateStore::new(dir.path().join("state.json")).load();
        assert!(!saved.in_warning_state);
        assert!(saved.meeting_start_times.is_empty());
        assert!(saved.warned_ids.contains("m1"));
    }

    #[tokio::test]
    async fn joined_meeting_does_not_cancel_next_warning() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let a_start = now() + minutes(60);
        let b_start = now() + minutes(95);
        let calendar = FakeCalendar::with_events(vec![zoom("a", a_start), zoom("b", b_start)]);

        // 09:57 warns A, then the user joins it.
        assert_eq!(scanner.scan(a_start - minutes(3), false, &calendar).await.len(), 1);
        scanner.presence_changed(true);
        scanner.presence_changed(false);

        // 10:31 warns B; A must not trigger a cancel that replaces B's warning.
        let b_warned_at = b_start - minutes(4);
        assert_eq!(scanner.scan(b_warned_at, false, &calendar).await.len(), 1);
        assert!(scanner.check_expiration(b_warned_at, false).is_none());
        assert!(scanner.in_warning_state());

        let cancel = scanner.check_expiration(b_start + minutes(5), false);
        assert_eq!(cancel, Some(ActionRequest::exclusive("cancel-warning")));
    }

    #[tokio::test]
    async fn leaving_does_not_touch_warning_state() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let calendar = FakeCalendar::with_events(vec![zoom("m1", now() + minutes(3))]);
        scanner.scan(now(), false, &calendar).await;

        scanner.presence_changed(false);
        assert!(scanner.in_warning_state());
    }

    #[tokio::test]
    async fn warned_ids_survive_restart() {
        let dir = tempdir().unwrap();
        let calendar = FakeCalendar::with_events(vec![zoom("m1", now() + minutes(3))]);

        {
            let mut first = scanner(&dir);
            assert_eq!(first.scan(now(), false, &calendar).await.len(), 1);
            // Dropped without any shutdown handling.
        }

        let mut second = scanner(&dir);
        assert!(second.is_warned("m1"));
        assert!(second.in_warning_state());
        assert!(second.scan(now() + minutes(1), false, &calendar).await.is_empty());

        let start = now() + minutes(3);
        assert_eq!(
            second.check_expiration(start + minutes(5), false),
            Some(ActionRequest::exclusive("cancel-warning"))
        );
        let saved = StateStore::new(dir.path().join("state.json")).load();
        assert!(!saved.in_warning_state);
        assert!(saved.warned_ids.contains("m1"));
    }

    #[tokio::test]
    async fn old_ids_are_pruned() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let start = now() + minutes(3);
        let calendar = FakeCalendar::with_events(vec![zoom("m1", start)]);
        scanner.scan(now(), false, &calendar).await;
        scanner.check_expiration(start + minutes(5), false);

        // Still listed within the trailing horizon: kept.
        scanner.scan(start + minutes(30), false, &calendar).await;
        assert!(scanner.is_warned("m1"));

        // No longer returned by the calendar: dropped.
        calendar.set_events(Vec::new());
        scanner.scan(start + minutes(61), false, &calendar).await;
        assert!(!scanner.is_warned("m1"));
        assert!(scanner.snapshot().is_empty());
    }

    #[tokio::test]
    async fn recent_records_survive_missing_listing() {
        let dir = tempdir().unwrap();
        let mut scanner = scanner(&dir);
        let start = now() + minutes(3);
        let calendar = FakeCalendar::with_events(vec![zoom("m1", start)]);
        scanner.scan(now(), false, &calendar).await;

        calendar.set_events(Vec::new());
        scanner.scan(now() + minutes(1), false, &calendar).await;
        assert!(scanner.is_warned("m1"));
        assert_eq!(scanner.records().count(), 1);
    }

    #[test]
    fn snapshot_keys_are_always_warned() {
        let dir = tempdir().unwrap();
        let mut snapshot = TrackerSnapshot::default();
        snapshot.meeting_start_times.insert("x".into(), now());
        let scanner = MeetingScanner::from_snapshot(
            &ScanConfig::default(),
            ActionNames::default(),
            StateStore::new(dir.path().join("state.json")),
            snapshot,
        )
        .unwrap();

        let snapshot = scanner.snapshot();
        for id in snapshot.meeting_start_times.keys() {
            assert!(snapshot.warned_ids.contains(id));
        }
    }

    #[tokio::test]
    async fn persist_failure_keeps_memory_state() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let mut scanner = MeetingScanner::load(
            &ScanConfig::default(),
            ActionNames::default(),
            StateStore::new(blocker.join("state.json")),
        )
        .unwrap();
        let calendar = FakeCalendar::with_events(vec![zoom("m1", now() + minutes(3))]);

        assert_eq!(scanner.scan(now(), false, &calendar).await.len(), 1);
        assert!(scanner.is_warned("m1"));
    }

    #[tokio::test]
    async fn extra_patterns_extend_detection() {
        let dir = tempdir().unwrap();
        let config = ScanConfig {
            warning_window: Duration::from_secs(300),
            extra_patterns: vec!["meet.example.org".into()],
            ..Default::default()
        };
        let mut scanner = MeetingScanner::load(
            &config,
            ActionNames::default(),
            StateStore::new(dir.path().join("state.json")),
        )
        .unwrap();
        let calendar = FakeCalendar::with_events(vec![
            CalendarEvent::new("custom", now() + minutes(2))
                .with_location("https://MEET.example.org/standup"),
        ]);

        assert_eq!(scanner.scan(now(), false, &calendar).await.len(), 1);
    }
}
