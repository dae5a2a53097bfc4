//! Typed records for both sides of the sync.
//!
//! The HTTP clients parse Notion pages and Google events into these
//! types once, at the boundary. Everything past that point works with
//! resolved values: missing text is an empty string, a missing
//! cross-reference is `None`.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// A point in time as either service stores it: a pure date or a
/// date-time carrying its UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl EventTime {
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::DateTime(dt) => dt.date_naive(),
        }
    }

    /// True for pure dates and for date-times at exactly 00:00.
    pub fn is_midnight(&self) -> bool {
        match self {
            EventTime::Date(_) => true,
            EventTime::DateTime(dt) => dt.hour() == 0 && dt.minute() == 0,
        }
    }

    /// The value as a date-time; pure dates become midnight in `offset`.
    pub fn to_datetime(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => d
                .and_time(NaiveTime::MIN)
                .and_local_timezone(offset)
                .single()
                .unwrap_or_else(|| d.and_time(NaiveTime::MIN).and_utc().fixed_offset()),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%:z")),
        }
    }
}

/// Notion's date property: a start and an optional end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDate {
    pub start: EventTime,
    pub end: Option<EventTime>,
}

impl TaskDate {
    pub fn new(start: EventTime, end: Option<EventTime>) -> Self {
        TaskDate { start, end }
    }

    pub fn on(date: NaiveDate) -> Self {
        TaskDate {
            start: EventTime::Date(date),
            end: None,
        }
    }
}

/// A row of the Notion task database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub date: TaskDate,
    pub location: String,
    pub extra_info: String,
    /// Selected calendar display name
    pub calendar_name: Option<String>,
    /// Paired Google event id (cross-reference)
    pub event_id: Option<String>,
    pub last_synced: Option<DateTime<FixedOffset>>,
    /// The user asked for the paired event to be removed
    pub delete_requested: bool,
    /// Maintained by Notion
    pub last_edited: DateTime<FixedOffset>,
    /// Link to the Notion page
    pub url: Option<String>,
}

impl TaskRecord {
    pub fn is_paired(&self) -> bool {
        self.event_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// A Google Calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub description: String,
    pub location: String,
    /// Calendar the event was listed from
    pub calendar_id: String,
    pub updated: DateTime<FixedOffset>,
    pub source_url: Option<String>,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// Event body rendered from a task, used for create and update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDraft {
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub description: String,
    pub location: String,
    pub source_url: Option<String>,
}

/// Fields of a task created from an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDraft {
    pub title: String,
    pub date: TaskDate,
    pub extra_info: String,
    pub location: String,
    pub calendar_name: String,
    pub event_id: String,
    /// Pre-formatted sync timestamp
    pub last_synced: String,
}

/// Partial task update. `None` leaves the property untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub date: Option<TaskDate>,
    pub location: Option<String>,
    pub calendar_name: Option<String>,
    pub event_id: Option<String>,
    /// Pre-formatted sync timestamp
    pub last_synced: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TaskUpdate::default()
    }
}
