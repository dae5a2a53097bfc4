//! The structured result every run ends with.

use serde::Serialize;

use crate::date_range::SyncWindow;
use crate::error::{StoreError, SyncResult};
use crate::sync::{SyncAction, SyncMode};

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub events_created: usize,
    pub events_updated: usize,
    pub events_moved: usize,
    pub events_deleted: usize,
    pub tasks_created: usize,
    pub tasks_updated: usize,
    pub tasks_marked_deleted: usize,
    pub in_sync: usize,
    pub skipped: usize,
    pub missing: usize,
    pub failed: usize,
}

impl SyncStats {
    pub fn add(&mut self, other: &SyncStats) {
        self.events_created += other.events_created;
        self.events_updated += other.events_updated;
        self.events_moved += other.events_moved;
        self.events_deleted += other.events_deleted;
        self.tasks_created += other.tasks_created;
        self.tasks_updated += other.tasks_updated;
        self.tasks_marked_deleted += other.tasks_marked_deleted;
        self.in_sync += other.in_sync;
        self.skipped += other.skipped;
        self.missing += other.missing;
        self.failed += other.failed;
    }

    pub fn event_changes(&self) -> usize {
        self.events_created + self.events_updated + self.events_moved + self.events_deleted
    }

    pub fn task_changes(&self) -> usize {
        self.tasks_created + self.tasks_updated + self.tasks_marked_deleted
    }

    pub fn has_changes(&self) -> bool {
        self.event_changes() + self.task_changes() > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Error,
}

/// A write that failed for one record. The run carried on without it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    pub record_id: String,
    pub action: SyncAction,
    pub message: String,
}

impl RecordFailure {
    pub fn new(record_id: &str, action: SyncAction, error: &StoreError) -> Self {
        RecordFailure {
            record_id: record_id.to_string(),
            action,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncSummary {
    pub status: SyncStatus,
    pub message: String,
    pub mode: SyncMode,
    pub window: SyncWindow,
    pub stats: SyncStats,
    pub failures: Vec<RecordFailure>,
}

impl SyncSummary {
    /// Build the summary from whatever the run managed to do. Per-record
    /// failures do not turn a run into an error; only an abort does.
    pub fn from_outcome(
        mode: SyncMode,
        window: SyncWindow,
        stats: SyncStats,
        failures: Vec<RecordFailure>,
        outcome: SyncResult<()>,
    ) -> Self {
        let (status, message) = match outcome {
            Ok(()) if failures.is_empty() => (
                SyncStatus::Success,
                format!("{mode} sync finished for {window}"),
            ),
            Ok(()) => (
                SyncStatus::Success,
                format!(
                    "{mode} sync finished for {window} with {} failed record(s)",
                    failures.len()
                ),
            ),
            Err(e) => (SyncStatus::Error, e.to_string()),
        };

        SyncSummary {
            status,
            message,
            mode,
            window,
            stats,
            failures,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }
}
