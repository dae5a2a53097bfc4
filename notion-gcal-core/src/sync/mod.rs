//! Reconciliation between the task database and the calendars.

mod action;
mod engine;
mod mode;
mod summary;

pub use action::{SyncAction, classify};
pub use engine::{Clock, Engine};
pub use mode::SyncMode;
pub use summary::{RecordFailure, SyncStats, SyncStatus, SyncSummary};
