//! Core types for notion-gcal-sync.
//!
//! This crate holds everything the reconciliation needs that does not
//! talk to the network:
//! - `record` types for Notion tasks and Google Calendar events
//! - `settings` and `identity` for the calendar table and sync options
//! - `normalize` for mapping task date ranges to event windows and back
//! - `store` traits the HTTP clients implement
//! - `sync` for the reconciliation engine itself

pub mod date_range;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod record;
pub mod settings;
pub mod store;
pub mod sync;
pub mod text;

pub use date_range::SyncWindow;
pub use error::{StoreError, StoreResult, SyncError, SyncResult};
pub use identity::CalendarIdentity;
pub use normalize::EventWindow;
pub use record::{
    EventDraft, EventRecord, EventTime, TaskDate, TaskDraft, TaskRecord, TaskUpdate,
};
pub use settings::{CalendarEntry, PropertyNames, Settings};
pub use store::{EventStore, TaskStore};
pub use sync::{
    Clock, Engine, RecordFailure, SyncAction, SyncMode, SyncStats, SyncStatus, SyncSummary,
};
