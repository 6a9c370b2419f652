//! Durable tracker state.
//!
//! The meeting tracker is the only state that survives a restart. It is
//! stored as one JSON document, always rewritten in full through a temporary
//! file and an atomic rename.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::ServerResult;

/// Persisted projection of the meeting tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSnapshot {
    /// Meetings that have already been warned about.
    pub warned_ids: BTreeSet<String>,
    /// Start times of warned meetings still awaiting expiration.
    pub meeting_start_times: BTreeMap<String, DateTime<Utc>>,
    /// Whether a warning is currently outstanding.
    pub in_warning_state: bool,
}

impl TrackerSnapshot {
    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.warned_ids.is_empty() && self.meeting_start_times.is_empty() && !self.in_warning_state
    }

    /// Ensures every id with a recorded start time is also marked warned.
    fn repair(&mut self) -> bool {
        let mut repaired = false;
        for id in self.meeting_start_times.keys() {
            if self.warned_ids.insert(id.clone()) {
                repaired = true;
            }
        }
        repaired
    }
}

/// Reads and writes the tracker snapshot file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot.
    ///
    /// A missing or unreadable file yields an empty snapshot.
    pub fn load(&self) -> TrackerSnapshot {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved state, starting fresh");
                return TrackerSnapshot::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read state, starting fresh");
                return TrackerSnapshot::default();
            }
        };

        match serde_json::from_str::<TrackerSnapshot>(&content) {
            Ok(mut snapshot) => {
                if snapshot.repair() {
                    warn!(path = %self.path.display(), "Repaired inconsistent saved state");
                }
                debug!(
                    warned = snapshot.warned_ids.len(),
                    tracked = snapshot.meeting_start_times.len(),
                    in_warning_state = snapshot.in_warning_state,
                    "Loaded saved state"
                );
                snapshot
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Corrupt state file, starting fresh");
                TrackerSnapshot::default()
            }
        }
    }

    /// Writes the complete snapshot atomically.
    pub fn save(&self, snapshot: &TrackerSnapshot) -> ServerResult<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let json = serde_json::to_vec_pretty(snapshot)?;
        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(&json)?;
        temp.write_all(b"\n")?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        debug!(path = %self.path.display(), "Saved state");
        Ok(())
    }
}

/// Returns the default state file path.
///
/// Uses the platform data directory, falling back to the temp directory.
pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("onair")
        .join("state.json")
}
