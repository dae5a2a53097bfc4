//! Error types for notion-gcal-sync.

use thiserror::Error;

/// Errors raised by a task or event store (the remote accessors).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not parse response: {0}")]
    Parse(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Errors that stop a sync run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Refusing to sync {count} {kind}: batch limit is {limit}")]
    BatchTooLarge {
        kind: &'static str,
        count: usize,
        limit: usize,
    },

    #[error(
        "Timezones differ between task '{task_id}' ({task_offset}) and event '{event_id}' ({event_offset})"
    )]
    TimezoneMismatch {
        task_id: String,
        event_id: String,
        task_offset: String,
        event_offset: String,
    },

    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: StoreError,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type SyncResult<T> = Result<T, SyncError>;
