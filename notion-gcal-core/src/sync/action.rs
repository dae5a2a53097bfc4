//! What happens to a single task during a run.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::record::{EventRecord, TaskRecord};
use crate::sync::SyncMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    CreateEvent,
    SkipDeletedUnpaired,
    DeleteEvent,
    /// Paired, but the event was not among the fetched ones
    EventMissing,
    InSync,
    PushTaskToEvent,
    PullEventToTask,
    CreateTask,
    /// Not handled by the current mode
    Skip,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncAction::CreateEvent => "create event",
            SyncAction::SkipDeletedUnpaired => "skip deleted",
            SyncAction::DeleteEvent => "delete event",
            SyncAction::EventMissing => "event missing",
            SyncAction::InSync => "in sync",
            SyncAction::PushTaskToEvent => "push",
            SyncAction::PullEventToTask => "pull",
            SyncAction::CreateTask => "create task",
            SyncAction::Skip => "skip",
        };
        write!(f, "{s}")
    }
}

/// Decide the action for `task`. `event` is the fetched event its
/// cross-reference points to, if any.
///
/// Fails only when a bidirectional comparison finds the two edit
/// timestamps in different offsets.
pub fn classify(
    mode: SyncMode,
    task: &TaskRecord,
    event: Option<&EventRecord>,
) -> SyncResult<SyncAction> {
    let paired = task.is_paired();

    if task.delete_requested {
        let handles_deletes = matches!(mode, SyncMode::Bidirectional | SyncMode::DeleteOnly);
        return Ok(match (handles_deletes, paired) {
            (false, _) => SyncAction::Skip,
            (true, true) => SyncAction::DeleteEvent,
            (true, false) => SyncAction::SkipDeletedUnpaired,
        });
    }

    if mode == SyncMode::DeleteOnly {
        return Ok(SyncAction::Skip);
    }

    if !paired {
        return Ok(match mode {
            SyncMode::ForcePull => SyncAction::Skip,
            _ => SyncAction::CreateEvent,
        });
    }

    let Some(event) = event else {
        return Ok(SyncAction::EventMissing);
    };

    match mode {
        SyncMode::ForcePull => Ok(SyncAction::PullEventToTask),
        SyncMode::ForcePush => Ok(SyncAction::PushTaskToEvent),
        _ => compare_timestamps(task, event),
    }
}

fn compare_timestamps(task: &TaskRecord, event: &EventRecord) -> SyncResult<SyncAction> {
    let edited = task.last_edited;
    let remote = event.updated;

    if edited.offset() != remote.offset() {
        return Err(SyncError::TimezoneMismatch {
            task_id: task.id.clone(),
            event_id: event.id.clone(),
            task_offset: edited.offset().to_string(),
            event_offset: remote.offset().to_string(),
        });
    }

    if let Some(synced) = task.last_synced {
        if synced > edited && synced > remote {
            return Ok(SyncAction::InSync);
        }
    }

    Ok(match edited.cmp(&remote) {
        Ordering::Greater => SyncAction::PushTaskToEvent,
        Ordering::Less => SyncAction::PullEventToTask,
        Ordering::Equal => SyncAction::InSync,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EventTime, TaskDate};
    use chrono::{DateTime, NaiveDate};

    fn ts(s: &str) -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn task(event_id: Option<&str>, delete_requested: bool) -> TaskRecord {
        TaskRecord {
            id: "page-1".to_string(),
            title: "Dentist".to_string(),
            date: TaskDate::on(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            location: String::new(),
            extra_info: String::new(),
            calendar_name: None,
            event_id: event_id.map(str::to_string),
            last_synced: None,
            delete_requested,
            last_edited: ts("2024-01-02T10:00:00Z"),
            url: None,
        }
    }

    fn event(updated: &str) -> EventRecord {
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        EventRecord {
            id: "evt-1".to_string(),
            summary: "Dentist".to_string(),
            start: EventTime::Date(day),
            end: EventTime::Date(day.succ_opt().unwrap()),
            description: String::new(),
            location: String::new(),
            calendar_id: "personal@group.calendar.google.com".to_string(),
            updated: ts(updated),
            source_url: None,
        }
    }

    #[test]
    fn test_unpaired_tasks() {
        let t = task(None, false);
        assert_eq!(
            classify(SyncMode::Bidirectional, &t, None).unwrap(),
            SyncAction::CreateEvent
        );
        assert_eq!(
            classify(SyncMode::ForcePush, &t, None).unwrap(),
            SyncAction::CreateEvent
        );
        assert_eq!(classify(SyncMode::ForcePull, &t, None).unwrap(), SyncAction::Skip);
        assert_eq!(classify(SyncMode::DeleteOnly, &t, None).unwrap(), SyncAction::Skip);
    }

    #[test]
    fn test_flagged_tasks() {
        let unpaired = task(None, true);
        let paired = task(Some("evt-1"), true);
        assert_eq!(
            classify(SyncMode::Bidirectional, &unpaired, None).unwrap(),
            SyncAction::SkipDeletedUnpaired
        );
        assert_eq!(
            classify(SyncMode::Bidirectional, &paired, None).unwrap(),
            SyncAction::DeleteEvent
        );
        assert_eq!(
            classify(SyncMode::DeleteOnly, &paired, None).unwrap(),
            SyncAction::DeleteEvent
        );
        assert_eq!(classify(SyncMode::ForcePull, &paired, None).unwrap(), SyncAction::Skip);
        assert_eq!(classify(SyncMode::ForcePush, &paired, None).unwrap(), SyncAction::Skip);
    }

    #[test]
    fn test_paired_without_fetched_event() {
        let t = task(Some("evt-1"), false);
        assert_eq!(
            classify(SyncMode::Bidirectional, &t, None).unwrap(),
            SyncAction::EventMissing
        );
    }

    #[test]
    fn test_most_recent_edit_wins() {
        let t = task(Some("evt-1"), false);

        let older = event("2024-01-01T10:00:00Z");
        assert_eq!(
            classify(SyncMode::Bidirectional, &t, Some(&older)).unwrap(),
            SyncAction::PushTaskToEvent
        );

        let newer = event("2024-01-03T10:00:00Z");
        assert_eq!(
            classify(SyncMode::Bidirectional, &t, Some(&newer)).unwrap(),
            SyncAction::PullEventToTask
        );

        let same = event("2024-01-02T10:00:00Z");
        assert_eq!(
            classify(SyncMode::Bidirectional, &t, Some(&same)).unwrap(),
            SyncAction::InSync
        );
    }

    #[test]
    fn test_sync_time_after_both_is_in_sync() {
        let mut t = task(Some("evt-1"), false);
        t.last_synced = Some(ts("2024-01-04T00:00:00Z"));
        let e = event("2024-01-03T10:00:00Z");
        assert_eq!(
            classify(SyncMode::Bidirectional, &t, Some(&e)).unwrap(),
            SyncAction::InSync
        );

        // An edit after the last sync is picked up again
        t.last_synced = Some(ts("2024-01-01T00:00:00Z"));
        assert_eq!(
            classify(SyncMode::Bidirectional, &t, Some(&e)).unwrap(),
            SyncAction::PullEventToTask
        );
    }

    #[test]
    fn test_force_modes_ignore_timestamps() {
        let mut t = task(Some("evt-1"), false);
        t.last_synced = Some(ts("2024-01-04T00:00:00Z"));
        let e = event("2024-01-03T10:00:00Z");
        assert_eq!(
            classify(SyncMode::ForcePull, &t, Some(&e)).unwrap(),
            SyncAction::PullEventToTask
        );
        assert_eq!(
            classify(SyncMode::ForcePush, &t, Some(&e)).unwrap(),
            SyncAction::PushTaskToEvent
        );
    }

    #[test]
    fn test_offset_mismatch_is_an_error() {
        let t = task(Some("evt-1"), false);
        let e = event("2024-01-03T18:00:00+08:00");
        let err = classify(SyncMode::Bidirectional, &t, Some(&e)).unwrap_err();
        assert!(matches!(err, SyncError::TimezoneMismatch { .. }));

        // Force modes never compare, so they do not check either
        assert!(classify(SyncMode::ForcePull, &t, Some(&e)).is_ok());
    }
}
