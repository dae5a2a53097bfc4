//! Mapping between Notion date ranges and Google event windows.
//!
//! Google all-day events use an exclusive end date (a one-day event on
//! the 5th ends on the 6th) while Notion stores an inclusive end, or no
//! end at all for a single day. The two functions here apply that shift
//! in opposite directions so that a task survives a trip through the
//! calendar unchanged.

use chrono::{DateTime, Duration, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;

use crate::record::{EventTime, TaskDate};
use crate::settings::Settings;

/// Start and end of a Google event, ready to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventWindow {
    pub start: EventTime,
    pub end: EventTime,
    pub all_day: bool,
}

/// Turn a task's date range into the event window Google expects.
pub fn to_event_window(date: &TaskDate, settings: &Settings) -> EventWindow {
    let offset = settings.offset();
    let length = Duration::minutes(i64::from(settings.default_event_length));
    let start = date.start;
    let end = date.end;

    let single_day = end.is_none_or(|e| e == start);

    // One all-day day
    if start.is_midnight() && single_day {
        if settings.convert_all_day_to_timed {
            let begin = EventTime::Date(start.date()).to_datetime(offset)
                + Duration::hours(i64::from(settings.default_event_start));
            return EventWindow {
                start: EventTime::DateTime(begin),
                end: EventTime::DateTime(begin + length),
                all_day: false,
            };
        }

        let day = start.date();
        return EventWindow {
            start: EventTime::Date(day),
            end: EventTime::Date(day + Duration::days(1)),
            all_day: true,
        };
    }

    // Several all-day days
    if let Some(end) = end {
        if start.is_midnight() && end.is_midnight() {
            return EventWindow {
                start: EventTime::Date(start.date()),
                end: EventTime::Date(end.date() + Duration::days(1)),
                all_day: true,
            };
        }
    }

    // Timed
    let begin = start.to_datetime(offset);
    let finish = match end {
        Some(e) if e != start => e.to_datetime(offset),
        _ => begin + length,
    };

    EventWindow {
        start: EventTime::DateTime(begin),
        end: EventTime::DateTime(finish),
        all_day: false,
    }
}

/// Turn an event's start and end back into a task date range.
///
/// Bounds that both fall on midnight in the configured offset are read
/// as whole days, whether Google sent them as dates or date-times.
pub fn from_event_window(start: &EventTime, end: &EventTime, settings: &Settings) -> TaskDate {
    let offset = settings.offset();
    let begin = start.to_datetime(offset).with_timezone(&offset);
    let finish = end.to_datetime(offset).with_timezone(&offset);

    if EventTime::DateTime(begin).is_midnight() && EventTime::DateTime(finish).is_midnight() {
        let first_day = begin.date_naive();
        let last_day = finish.date_naive() - Duration::days(1);
        return if last_day <= first_day {
            TaskDate::on(first_day)
        } else {
            TaskDate::new(EventTime::Date(first_day), Some(EventTime::Date(last_day)))
        };
    }

    TaskDate::new(EventTime::DateTime(begin), Some(EventTime::DateTime(finish)))
}

/// Format a task date bound the way Notion's date property expects it.
pub fn notion_date_string(time: &EventTime) -> String {
    time.to_string()
}

/// Google's `start`/`end` object: `{"date": ..}` for all-day bounds,
/// `{"dateTime": .., "timeZone": ..}` otherwise.
pub fn google_time(time: &EventTime, timezone: &str) -> serde_json::Value {
    match time {
        EventTime::Date(d) => serde_json::json!({ "date": d.format("%Y-%m-%d").to_string() }),
        EventTime::DateTime(dt) => serde_json::json!({
            "dateTime": dt.to_rfc3339_opts(SecondsFormat::Secs, false),
            "timeZone": timezone,
        }),
    }
}

/// Timestamp written into the task's sync-time property.
///
/// Same shape as Google's `updated` field (UTC, milliseconds, `Z`), so the
/// two compare directly.
pub fn sync_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a timestamp produced by either service.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim()).ok()
}
