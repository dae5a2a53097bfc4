//! Calendar name <-> calendar id resolution.

use std::collections::HashMap;

use crate::error::{SyncError, SyncResult};
use crate::settings::{CalendarEntry, Settings};

/// Bidirectional lookup over the configured calendar table.
#[derive(Debug, Clone)]
pub struct CalendarIdentity {
    by_name: HashMap<String, String>,
    by_id: HashMap<String, String>,
    ordered_ids: Vec<String>,
    default: CalendarEntry,
    readonly_patterns: Vec<String>,
}

impl CalendarIdentity {
    pub fn from_settings(settings: &Settings) -> SyncResult<Self> {
        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        let mut ordered_ids = Vec::new();

        for entry in &settings.calendars {
            if by_name
                .insert(entry.name.clone(), entry.id.clone())
                .is_some()
            {
                return Err(SyncError::Config(format!(
                    "calendar name '{}' appears twice",
                    entry.name
                )));
            }
            if by_id.insert(entry.id.clone(), entry.name.clone()).is_some() {
                return Err(SyncError::Config(format!(
                    "calendar id '{}' appears twice",
                    entry.id
                )));
            }
            ordered_ids.push(entry.id.clone());
        }

        let default = match &settings.default_calendar {
            Some(name) => {
                let id = by_name.get(name).ok_or_else(|| {
                    SyncError::Config(format!(
                        "default calendar '{name}' is not in the calendar table"
                    ))
                })?;
                CalendarEntry {
                    name: name.clone(),
                    id: id.clone(),
                }
            }
            None => settings
                .calendars
                .first()
                .cloned()
                .ok_or_else(|| SyncError::Config("no calendars configured".into()))?,
        };

        Ok(CalendarIdentity {
            by_name,
            by_id,
            ordered_ids,
            default,
            readonly_patterns: settings.readonly_calendar_patterns.clone(),
        })
    }

    /// Calendar id for a task's selected calendar. A missing or unknown
    /// name resolves to the default calendar.
    pub fn calendar_id(&self, name: Option<&str>) -> &str {
        name.and_then(|n| self.by_name.get(n))
            .map(String::as_str)
            .unwrap_or(self.default.id.as_str())
    }

    /// Display name for a calendar id, `None` when it is not configured.
    pub fn calendar_name(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(String::as_str)
    }

    pub fn default_name(&self) -> &str {
        &self.default.name
    }

    /// All configured calendar ids, in table order.
    pub fn calendar_ids(&self) -> &[String] {
        &self.ordered_ids
    }

    /// Subscribed calendars (e.g. `...@import.calendar.google.com`) can
    /// be read but never written.
    pub fn is_subscribed_readonly(&self, calendar_id: &str) -> bool {
        self.readonly_patterns
            .iter()
            .any(|p| !p.is_empty() && calendar_id.contains(p.as_str()))
    }
}
