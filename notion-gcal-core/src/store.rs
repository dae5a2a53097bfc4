//! The two remote collections the engine reconciles.
//!
//! The binary implements these over HTTP; tests implement them in memory.

use async_trait::async_trait;

use crate::date_range::SyncWindow;
use crate::error::StoreResult;
use crate::record::{EventDraft, EventRecord, TaskDraft, TaskRecord, TaskUpdate};

/// The Notion task database.
#[async_trait]
pub trait TaskStore {
    /// Tasks whose date falls in the window, flagged tasks included.
    async fn list_tasks(&self, window: &SyncWindow) -> StoreResult<Vec<TaskRecord>>;

    /// Every task referencing `event_id`, regardless of date.
    async fn list_tasks_by_event_id(&self, event_id: &str) -> StoreResult<Vec<TaskRecord>>;

    async fn create_task(&self, draft: &TaskDraft) -> StoreResult<TaskRecord>;

    /// Partial update; `None` fields are left as they are.
    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> StoreResult<()>;

    /// Make a task inert after its event was deleted: clear the
    /// cross-reference and sync time, keep the delete flag.
    async fn mark_deleted(&self, task_id: &str) -> StoreResult<()>;
}

/// Google Calendar, across every configured calendar.
#[async_trait]
pub trait EventStore {
    async fn list_events(&self, window: &SyncWindow) -> StoreResult<Vec<EventRecord>>;

    async fn create_event(&self, calendar_id: &str, draft: &EventDraft)
    -> StoreResult<EventRecord>;

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        draft: &EventDraft,
    ) -> StoreResult<()>;

    async fn move_event(&self, from: &str, event_id: &str, to: &str) -> StoreResult<()>;

    /// Deleting an event that no longer exists succeeds.
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> StoreResult<()>;
}
