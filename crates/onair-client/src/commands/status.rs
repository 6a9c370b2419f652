//! Status command: reports the lock holder and the saved tracker state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use onair_server::{StateStore, TrackerSnapshot, is_process_running, read_holder};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Snapshot of what the monitor is doing, as seen from the filesystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Lock file location.
    pub lock_path: PathBuf,
    /// PID recorded in the lock file.
    pub pid: Option<u32>,
    /// Whether that PID is alive.
    pub running: bool,
    /// State file location.
    pub state_path: PathBuf,
    /// Whether a meeting warning is outstanding.
    pub in_warning_state: bool,
    /// Number of meetings remembered as warned.
    pub warned_count: usize,
    /// Warned meetings not yet expired, by start time.
    pub pending_meetings: Vec<PendingMeeting>,
}

/// A warned meeting awaiting expiration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingMeeting {
    /// Calendar event id.
    pub id: String,
    /// Meeting start.
    pub start: DateTime<Utc>,
}

impl StatusReport {
    /// Collects the report from the given lock and state files.
    pub fn collect(lock_path: &Path, state_path: &Path) -> Self {
        let pid = read_holder(lock_path);
        let running = pid.is_some_and(is_process_running);
        let snapshot = StateStore::new(state_path).load();
        Self::from_parts(lock_path, pid, running, state_path, snapshot)
    }

    fn from_parts(
        lock_path: &Path,
        pid: Option<u32>,
        running: bool,
        state_path: &Path,
        snapshot: TrackerSnapshot,
    ) -> Self {
        let mut pending_meetings: Vec<PendingMeeting> = snapshot
            .meeting_start_times
            .into_iter()
            .map(|(id, start)| PendingMeeting { id, start })
            .collect();
        pending_meetings.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));

        Self {
            lock_path: lock_path.to_path_buf(),
            pid,
            running,
            state_path: state_path.to_path_buf(),
            in_warning_state: snapshot.in_warning_state,
            warned_count: snapshot.warned_ids.len(),
            pending_meetings,
        }
    }

    /// Renders the report for a terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        match (self.pid, self.running) {
            (Some(pid), true) => out.push_str(&format!("monitor: running (pid {pid})\n")),
            (Some(pid), false) => out.push_str(&format!("monitor: not running (stale lock, pid {pid})\n")),
            (None, _) => out.push_str("monitor: not running\n"),
        }
        out.push_str(&format!("lock:    {}\n", self.lock_path.display()));
        out.push_str(&format!("state:   {}\n", self.state_path.display()));
        out.push_str(&format!(
            "warning: {}\n",
            if self.in_warning_state { "active" } else { "none" }
        ));
        out.push_str(&format!("warned:  {} meeting(s)\n", self.warned_count));
        for meeting in &self.pending_meetings {
            out.push_str(&format!("  - {} at {}\n", meeting.id, meeting.start.to_rfc3339()));
        }
        out
    }
}

/// Prints the monitor status.
pub fn status(config: &ClientConfig, json: bool) -> ClientResult<()> {
    let report = StatusReport::collect(&config.lock_path(), &config.state_path());
    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| ClientError::Config(format!("failed to serialize status: {}", e)))?;
        println!("{}", text);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}
