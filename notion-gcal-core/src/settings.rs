//! Sync settings shared by the normalizer, the resolver and the engine.
//!
//! One `Settings` value is loaded by the binary and passed explicitly
//! into the engine; nothing in this crate reads ambient configuration.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

const DEFAULT_EVENT_LENGTH: u32 = 60;
const DEFAULT_EVENT_START: u32 = 8;
const DEFAULT_MAX_BATCH: usize = 100;
const DEFAULT_GOBACK_DAYS: i64 = 3;
const DEFAULT_GOFORWARD_DAYS: i64 = 90;
const IMPORT_CALENDAR_SUFFIX: &str = "@import.calendar.google.com";

fn default_event_length() -> u32 {
    DEFAULT_EVENT_LENGTH
}

fn default_event_start() -> u32 {
    DEFAULT_EVENT_START
}

fn default_max_batch() -> usize {
    DEFAULT_MAX_BATCH
}

fn default_goback_days() -> i64 {
    DEFAULT_GOBACK_DAYS
}

fn default_goforward_days() -> i64 {
    DEFAULT_GOFORWARD_DAYS
}

fn default_readonly_patterns() -> Vec<String> {
    vec![IMPORT_CALENDAR_SUFFIX.to_string()]
}

/// One row of the calendar table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub name: String,
    pub id: String,
}

/// Names of the Notion database properties. Users can rename their
/// columns, so every property the sync touches is configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyNames {
    pub title: String,
    pub date: String,
    /// Formula column holding the end (or start) date, used to filter the window
    pub end_date: String,
    pub location: String,
    pub extra_info: String,
    pub calendar: String,
    pub event_id: String,
    pub sync_time: String,
    pub delete: String,
}

impl Default for PropertyNames {
    fn default() -> Self {
        PropertyNames {
            title: "Task Name".to_string(),
            date: "Date".to_string(),
            end_date: "GCal End Date".to_string(),
            location: "Location".to_string(),
            extra_info: "Extra Info".to_string(),
            calendar: "Calendar".to_string(),
            event_id: "GCal Event Id".to_string(),
            sync_time: "GCal Sync Time".to_string(),
            delete: "Delete from GCal?".to_string(),
        }
    }
}

impl PropertyNames {
    fn all(&self) -> [(&'static str, &str); 9] {
        [
            ("title", &self.title),
            ("date", &self.date),
            ("end_date", &self.end_date),
            ("location", &self.location),
            ("extra_info", &self.extra_info),
            ("calendar", &self.calendar),
            ("event_id", &self.event_id),
            ("sync_time", &self.sync_time),
            ("delete", &self.delete),
        ]
    }
}

/// Options controlling one sync run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// IANA timezone name sent to Google with timed events
    pub timezone: String,

    /// UTC offset appended to Notion date-times, e.g. "+08:00"
    pub timecode: String,

    /// Calendar table: display name <-> Google calendar id
    pub calendars: Vec<CalendarEntry>,

    /// Name of the calendar used when a task has none selected.
    /// Defaults to the first entry of `calendars`.
    #[serde(default)]
    pub default_calendar: Option<String>,

    /// Default event length in minutes
    #[serde(default = "default_event_length")]
    pub default_event_length: u32,

    /// Hour of day used when an all-day task is converted to a timed event
    #[serde(default = "default_event_start")]
    pub default_event_start: u32,

    /// Turn single-day all-day tasks into timed events
    #[serde(default)]
    pub convert_all_day_to_timed: bool,

    /// Abort a run when either side returns more records than this
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,

    #[serde(default = "default_goback_days")]
    pub goback_days: i64,

    #[serde(default = "default_goforward_days")]
    pub goforward_days: i64,

    /// Calendar ids containing one of these are subscriptions and are never written
    #[serde(default = "default_readonly_patterns")]
    pub readonly_calendar_patterns: Vec<String>,

    #[serde(default)]
    pub properties: PropertyNames,
}

impl Settings {
    /// Minimal settings for one calendar; every other option takes its default.
    pub fn new(timezone: &str, timecode: &str, calendars: Vec<CalendarEntry>) -> Self {
        Settings {
            timezone: timezone.to_string(),
            timecode: timecode.to_string(),
            calendars,
            default_calendar: None,
            default_event_length: DEFAULT_EVENT_LENGTH,
            default_event_start: DEFAULT_EVENT_START,
            convert_all_day_to_timed: false,
            max_batch: DEFAULT_MAX_BATCH,
            goback_days: DEFAULT_GOBACK_DAYS,
            goforward_days: DEFAULT_GOFORWARD_DAYS,
            readonly_calendar_patterns: default_readonly_patterns(),
            properties: PropertyNames::default(),
        }
    }

    /// The configured offset. Call `validate` first; an unparsable
    /// timecode falls back to UTC here.
    pub fn offset(&self) -> FixedOffset {
        parse_offset(&self.timecode).unwrap_or_else(|| Utc.fix())
    }

    /// Check everything that would otherwise fail half way through a run.
    pub fn validate(&self) -> SyncResult<()> {
        if self.calendars.is_empty() {
            return Err(SyncError::Config(
                "at least one calendar must be configured".into(),
            ));
        }

        for entry in &self.calendars {
            if entry.name.trim().is_empty() || entry.id.trim().is_empty() {
                return Err(SyncError::Config(
                    "calendar entries need both a name and an id".into(),
                ));
            }
        }

        if let Some(name) = &self.default_calendar {
            if !self.calendars.iter().any(|c| &c.name == name) {
                return Err(SyncError::Config(format!(
                    "default calendar '{name}' is not in the calendar table"
                )));
            }
        }

        if parse_offset(&self.timecode).is_none() {
            return Err(SyncError::Config(format!(
                "invalid timecode '{}', expected something like +08:00",
                self.timecode
            )));
        }

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(SyncError::Config(format!(
                "unknown timezone '{}'",
                self.timezone
            )));
        }

        if self.default_event_start > 23 {
            return Err(SyncError::Config(format!(
                "default_event_start must be an hour between 0 and 23, got {}",
                self.default_event_start
            )));
        }

        if self.default_event_length == 0 {
            return Err(SyncError::Config(
                "default_event_length must be at least one minute".into(),
            ));
        }

        if self.max_batch == 0 {
            return Err(SyncError::Config("max_batch must be positive".into()));
        }

        if self.goback_days < 0 || self.goforward_days < 0 {
            return Err(SyncError::Config(
                "goback_days and goforward_days cannot be negative".into(),
            ));
        }

        for (field, name) in self.properties.all() {
            if name.trim().is_empty() {
                return Err(SyncError::Config(format!(
                    "property name for '{field}' is empty"
                )));
            }
        }

        Ok(())
    }
}

/// Parse "+08:00", "-05:30", "+0800" or "Z" into a fixed offset.
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s == "Z" || s == "z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.chars().next()? {
        '+' => (1, &s[1..]),
        '-' => (-1, &s[1..]),
        _ => return None,
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
