//! The reconciliation loop.
//!
//! One run fetches both sides, checks the batch ceiling, then walks the
//! tasks in fetched order and applies exactly one action to each. Events
//! no task pointed at become new tasks at the end. Every store call is
//! awaited before the next one starts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::date_range::SyncWindow;
use crate::error::{StoreError, StoreResult, SyncError, SyncResult};
use crate::identity::CalendarIdentity;
use crate::normalize::{from_event_window, sync_timestamp, to_event_window};
use crate::record::{EventDraft, EventRecord, TaskDraft, TaskRecord, TaskUpdate};
use crate::settings::Settings;
use crate::store::{EventStore, TaskStore};
use crate::sync::{RecordFailure, SyncAction, SyncMode, SyncStats, SyncSummary, classify};
use crate::text::strip_leading_emoji;

/// Source of "now" for sync timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct Engine<T, E> {
    settings: Settings,
    identity: CalendarIdentity,
    tasks: T,
    events: E,
    clock: Clock,
}

#[derive(Default)]
struct RunState {
    stats: SyncStats,
    failures: Vec<RecordFailure>,
    /// Events deleted during this run
    deleted: HashSet<String>,
}

impl RunState {
    fn fail(&mut self, record_id: &str, action: SyncAction, err: StoreError) {
        error!(record_id, %action, error = %err, "record failed, continuing");
        self.stats.failed += 1;
        self.failures.push(RecordFailure::new(record_id, action, &err));
    }
}

impl<T: TaskStore, E: EventStore> Engine<T, E> {
    /// Validates `settings` before anything touches the network.
    pub fn new(settings: Settings, tasks: T, events: E) -> SyncResult<Self> {
        settings.validate()?;
        let identity = CalendarIdentity::from_settings(&settings)?;

        Ok(Engine {
            settings,
            identity,
            tasks,
            events,
            clock: Arc::new(Utc::now),
        })
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The window configured in the settings, anchored on today.
    pub fn default_window(&self) -> SyncWindow {
        SyncWindow::from_settings(&self.settings)
    }

    /// Run one reconciliation. Never fails: aborts end up in the
    /// summary's status and message, next to whatever was done before.
    pub async fn run(&self, mode: SyncMode, window: SyncWindow) -> SyncSummary {
        info!(%mode, %window, "starting sync");

        let mut state = RunState::default();
        let outcome = self.reconcile(mode, &window, &mut state).await;

        match &outcome {
            Ok(()) => info!(
                event_changes = state.stats.event_changes(),
                task_changes = state.stats.task_changes(),
                failed = state.stats.failed,
                "sync finished"
            ),
            Err(e) => error!(error = %e, "sync aborted"),
        }

        SyncSummary::from_outcome(mode, window, state.stats, state.failures, outcome)
    }

    async fn reconcile(
        &self,
        mode: SyncMode,
        window: &SyncWindow,
        state: &mut RunState,
    ) -> SyncResult<()> {
        let tasks = self
            .tasks
            .list_tasks(window)
            .await
            .map_err(|source| SyncError::Fetch {
                what: "tasks",
                source,
            })?;
        let events = self
            .events
            .list_events(window)
            .await
            .map_err(|source| SyncError::Fetch {
                what: "events",
                source,
            })?;
        debug!(tasks = tasks.len(), events = events.len(), "fetched records");

        self.check_ceiling("tasks", tasks.len())?;
        self.check_ceiling("events", events.len())?;

        // Events no task has matched yet; each one is handed to one task at most
        let mut remaining: HashMap<&str, &EventRecord> =
            events.iter().map(|e| (e.id.as_str(), e)).collect();

        for task in &tasks {
            let event_id = task.event_id.as_deref().filter(|id| !id.is_empty());

            if let Some(id) = event_id {
                if state.deleted.contains(id) {
                    debug!(task = %task, event_id = id, "event already deleted this run");
                    state.stats.skipped += 1;
                    continue;
                }
            }

            let event = event_id.and_then(|id| remaining.remove(id));

            let action = classify(mode, task, event)?;
            debug!(task = %task, %action, "classified");

            if let Err(err) = self.apply(action, task, event, state).await {
                state.fail(&task.id, action, err);
            }
        }

        if mode.creates_tasks() {
            let unclaimed: Vec<&EventRecord> = events
                .iter()
                .filter(|e| remaining.contains_key(e.id.as_str()))
                .collect();
            for event in unclaimed {
                if let Err(err) = self.create_task(event, state).await {
                    state.fail(&event.id, SyncAction::CreateTask, err);
                }
            }
        }

        Ok(())
    }

    fn check_ceiling(&self, kind: &'static str, count: usize) -> SyncResult<()> {
        if count > self.settings.max_batch {
            return Err(SyncError::BatchTooLarge {
                kind,
                count,
                limit: self.settings.max_batch,
            });
        }
        Ok(())
    }

    async fn apply(
        &self,
        action: SyncAction,
        task: &TaskRecord,
        event: Option<&EventRecord>,
        state: &mut RunState,
    ) -> StoreResult<()> {
        match (action, event) {
            (SyncAction::CreateEvent, _) => self.create_event(task, state).await,
            (SyncAction::DeleteEvent, _) => self.delete_event(task, event, state).await,
            (SyncAction::PushTaskToEvent, Some(event)) => self.push(task, event, state).await,
            (SyncAction::PullEventToTask, Some(event)) => self.pull(task, event, state).await,
            (SyncAction::InSync, _) => {
                state.stats.in_sync += 1;
                Ok(())
            }
            (SyncAction::EventMissing, _) => {
                warn!(
                    task = %task,
                    event_id = task.event_id.as_deref().unwrap_or_default(),
                    "paired event not found in window, leaving task alone"
                );
                state.stats.missing += 1;
                Ok(())
            }
            _ => {
                state.stats.skipped += 1;
                Ok(())
            }
        }
    }

    async fn create_event(&self, task: &TaskRecord, state: &mut RunState) -> StoreResult<()> {
        let calendar_id = self.identity.calendar_id(task.calendar_name.as_deref());
        if self.identity.is_subscribed_readonly(calendar_id) {
            warn!(task = %task, calendar_id, "calendar is read-only, not creating event");
            state.stats.skipped += 1;
            return Ok(());
        }

        let created = self
            .events
            .create_event(calendar_id, &self.event_draft(task))
            .await?;
        state.stats.events_created += 1;
        info!(task = %task, event_id = %created.id, calendar_id, "created event");

        // Sync time stays unset: the next run compares the new pair once.
        let update = TaskUpdate {
            event_id: Some(created.id),
            calendar_name: task
                .calendar_name
                .is_none()
                .then(|| self.identity.default_name().to_string()),
            ..Default::default()
        };
        self.tasks.update_task(&task.id, &update).await
    }

    async fn delete_event(
        &self,
        task: &TaskRecord,
        event: Option<&EventRecord>,
        state: &mut RunState,
    ) -> StoreResult<()> {
        let Some(event_id) = task.event_id.as_deref() else {
            return Ok(());
        };
        let calendar_id = match event {
            Some(e) => e.calendar_id.as_str(),
            None => self.identity.calendar_id(task.calendar_name.as_deref()),
        };

        if self.identity.is_subscribed_readonly(calendar_id) {
            warn!(
                task = %task,
                calendar_id,
                "calendar is read-only, unlinking task without deleting the event"
            );
        } else {
            match self.events.delete_event(calendar_id, event_id).await {
                Ok(()) => {
                    state.stats.events_deleted += 1;
                    info!(task = %task, event_id, calendar_id, "deleted event");
                }
                Err(e) if e.is_not_found() => {
                    debug!(task = %task, event_id, "event already gone");
                }
                Err(e) => return Err(e),
            }
        }
        state.deleted.insert(event_id.to_string());

        self.tasks.mark_deleted(&task.id).await?;
        state.stats.tasks_marked_deleted += 1;

        let linked = self.tasks.list_tasks_by_event_id(event_id).await?;
        for other in linked.iter().filter(|t| t.id != task.id) {
            self.tasks.mark_deleted(&other.id).await?;
            state.stats.tasks_marked_deleted += 1;
            info!(task = %other, event_id, "unlinked another task pointing at the deleted event");
        }

        Ok(())
    }

    async fn push(
        &self,
        task: &TaskRecord,
        event: &EventRecord,
        state: &mut RunState,
    ) -> StoreResult<()> {
        let target = self.identity.calendar_id(task.calendar_name.as_deref());
        if self.identity.is_subscribed_readonly(&event.calendar_id)
            || self.identity.is_subscribed_readonly(target)
        {
            warn!(task = %task, event_id = %event.id, "calendar is read-only, not pushing");
            state.stats.skipped += 1;
            return Ok(());
        }

        if target != event.calendar_id {
            self.events
                .move_event(&event.calendar_id, &event.id, target)
                .await?;
            state.stats.events_moved += 1;
            info!(
                task = %task,
                from = %event.calendar_id,
                to = target,
                "moved event to another calendar"
            );
        }

        self.events
            .update_event(target, &event.id, &self.event_draft(task))
            .await?;
        state.stats.events_updated += 1;
        info!(task = %task, event_id = %event.id, "pushed task to event");

        let update = TaskUpdate {
            last_synced: Some(self.now()),
            ..Default::default()
        };
        self.tasks.update_task(&task.id, &update).await
    }

    async fn pull(
        &self,
        task: &TaskRecord,
        event: &EventRecord,
        state: &mut RunState,
    ) -> StoreResult<()> {
        let update = TaskUpdate {
            title: Some(strip_leading_emoji(&event.summary)),
            date: Some(from_event_window(&event.start, &event.end, &self.settings)),
            location: Some(event.location.clone()),
            calendar_name: self
                .identity
                .calendar_name(&event.calendar_id)
                .map(str::to_string),
            event_id: None,
            last_synced: Some(self.now()),
        };

        self.tasks.update_task(&task.id, &update).await?;
        state.stats.tasks_updated += 1;
        info!(task = %task, event_id = %event.id, "pulled event into task");
        Ok(())
    }

    async fn create_task(&self, event: &EventRecord, state: &mut RunState) -> StoreResult<()> {
        let calendar_name = self
            .identity
            .calendar_name(&event.calendar_id)
            .unwrap_or(self.identity.default_name());

        let draft = TaskDraft {
            title: event.summary.clone(),
            date: from_event_window(&event.start, &event.end, &self.settings),
            extra_info: event.description.clone(),
            location: event.location.clone(),
            calendar_name: calendar_name.to_string(),
            event_id: event.id.clone(),
            last_synced: self.now(),
        };

        let created = self.tasks.create_task(&draft).await?;
        state.stats.tasks_created += 1;
        info!(task = %created, event_id = %event.id, calendar = calendar_name, "created task");
        Ok(())
    }

    fn event_draft(&self, task: &TaskRecord) -> EventDraft {
        let window = to_event_window(&task.date, &self.settings);
        EventDraft {
            summary: task.title.clone(),
            start: window.start,
            end: window.end,
            description: task.extra_info.clone(),
            location: task.location.clone(),
            source_url: task.url.clone(),
        }
    }

    fn now(&self) -> String {
        sync_timestamp((self.clock)())
    }
}
