use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::{AvailabilityState, DailySchedule};

/// Snapshots older than this are ignored on restore.
pub const SNAPSHOT_TTL_HOURS: i64 = 24;

/// The persisted shape of the state machine: schedule, availability and
/// timestamps only. Prompt bookkeeping is deliberately excluded and gets
/// rebuilt on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub doctor_id: Uuid,
    pub schedule: Option<DailySchedule>,
    pub availability: AvailabilityState,
    pub captured_at: DateTime<Utc>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("Snapshot is {age_hours}h old, past the 24h staleness window")]
    Stale { age_hours: i64 },

    #[error("Snapshot belongs to a different doctor")]
    DoctorMismatch,

    #[error("Could not read or write snapshot: {0}")]
    Io(String),
}

impl ScheduleSnapshot {
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.captured_at > Duration::hours(SNAPSHOT_TTL_HOURS)
    }

    /// Read a snapshot from disk. A missing file is not an error: there is
    /// simply nothing to restore.
    pub fn load_from(path: &Path) -> Result<Option<Self>, SnapshotError> {
        if !path.exists() {
            return Ok(None);
        }
        let data =
            fs::read_to_string(path).map_err(|e| SnapshotError::Io(e.to_string()))?;
        let snapshot: ScheduleSnapshot =
            serde_json::from_str(&data).map_err(|e| SnapshotError::Io(e.to_string()))?;
        debug!("Loaded snapshot captured at {}", snapshot.captured_at);
        Ok(Some(snapshot))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SnapshotError> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| SnapshotError::Io(e.to_string()))?;
        fs::write(path, data).map_err(|e| SnapshotError::Io(e.to_string()))?;
        debug!("Snapshot written to {}", path.display());
        Ok(())
    }
}
