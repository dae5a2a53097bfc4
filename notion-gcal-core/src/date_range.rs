//! The date window a sync run covers.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::settings::Settings;

/// Half-open window `[after, before)` of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncWindow {
    pub after: NaiveDate,
    pub before: NaiveDate,
}

impl SyncWindow {
    pub fn new(after: NaiveDate, before: NaiveDate) -> Self {
        SyncWindow { after, before }
    }

    /// Window from `back_days` before `today` up to `forward_days` after it.
    pub fn around(today: NaiveDate, back_days: i64, forward_days: i64) -> Self {
        SyncWindow {
            after: today - Duration::days(back_days),
            before: today + Duration::days(forward_days),
        }
    }

    /// Window configured in `settings`, anchored on today's local date.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::around(
            Local::now().date_naive(),
            settings.goback_days,
            settings.goforward_days,
        )
    }

    /// Start of the window as a date-time in `offset` (for API filters).
    pub fn after_at(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        start_of_day(self.after, offset)
    }

    /// End of the window (exclusive) as a date-time in `offset`.
    pub fn before_at(&self, offset: FixedOffset) -> DateTime<FixedOffset> {
        start_of_day(self.before, offset)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.after && date < self.before
    }
}

impl std::fmt::Display for SyncWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (included) to {} (excluded)",
            self.after.format("%Y-%m-%d"),
            self.before.format("%Y-%m-%d")
        )
    }
}

fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let naive = date.and_time(NaiveTime::MIN);
    naive
        .and_local_timezone(offset)
        .single()
        .unwrap_or_else(|| naive.and_utc().fixed_offset())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_around_today() {
        let window = SyncWindow::around(d(2024, 3, 10), 3, 90);
        assert_eq!(window.after, d(2024, 3, 7));
        assert_eq!(window.before, d(2024, 6, 8));
    }

    #[test]
    fn test_window_is_half_open() {
        let window = SyncWindow::new(d(2024, 1, 1), d(2024, 1, 31));
        assert!(window.contains(d(2024, 1, 1)));
        assert!(window.contains(d(2024, 1, 30)));
        assert!(!window.contains(d(2024, 1, 31)));
        assert!(!window.contains(d(2023, 12, 31)));
    }

    #[test]
    fn test_bounds_in_offset() {
        let window = SyncWindow::new(d(2024, 1, 1), d(2024, 2, 1));
        let perth = FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(window.after_at(perth).to_rfc3339(), "2024-01-01T00:00:00+08:00");
        assert_eq!(window.before_at(perth).to_rfc3339(), "2024-02-01T00:00:00+08:00");
    }
}
