//! Terminal rendering for sync results.
//!
//! Extension traits over the core types, colored with owo_colors.

use notion_gcal_core::{RecordFailure, SyncStats, SyncStatus, SyncSummary};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for SyncStatus {
    fn render(&self) -> String {
        match self {
            SyncStatus::Success => "✓".green().to_string(),
            SyncStatus::Error => "✗".red().to_string(),
        }
    }
}

impl Render for RecordFailure {
    fn render(&self) -> String {
        format!(
            "{} {} {}",
            "!".red(),
            format!("{} ({})", self.action, self.record_id).red(),
            self.message.dimmed()
        )
    }
}

impl Render for SyncStats {
    fn render(&self) -> String {
        if !self.has_changes() {
            return "   No changes".dimmed().to_string();
        }

        let mut lines = Vec::new();

        let events = [
            (self.events_created, "created"),
            (self.events_updated, "updated"),
            (self.events_moved, "moved"),
            (self.events_deleted, "deleted"),
        ];
        if let Some(line) = render_counts("Google Calendar", &events) {
            lines.push(line);
        }

        let tasks = [
            (self.tasks_created, "created"),
            (self.tasks_updated, "updated"),
            (self.tasks_marked_deleted, "unlinked"),
        ];
        if let Some(line) = render_counts("Notion", &tasks) {
            lines.push(line);
        }

        lines.join("\n")
    }
}

/// "   Label: 2 created, 1 updated", or nothing when every count is zero
fn render_counts(label: &str, counts: &[(usize, &str)]) -> Option<String> {
    let parts: Vec<String> = counts
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, verb)| {
            let text = format!("{n} {verb}");
            match *verb {
                "created" => text.green().to_string(),
                "deleted" | "unlinked" => text.red().to_string(),
                _ => text.yellow().to_string(),
            }
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(format!("   {}: {}", label, parts.join(", ")))
    }
}

impl Render for SyncSummary {
    fn render(&self) -> String {
        let message = match self.status {
            SyncStatus::Success => self.message.clone(),
            SyncStatus::Error => self.message.red().to_string(),
        };
        let mut lines = vec![
            format!("{} {}", self.status.render(), message),
            self.stats.render(),
        ];

        let mut quiet = Vec::new();
        if self.stats.in_sync > 0 {
            quiet.push(format!("{} in sync", self.stats.in_sync));
        }
        if self.stats.skipped > 0 {
            quiet.push(format!("{} skipped", self.stats.skipped));
        }
        if self.stats.missing > 0 {
            quiet.push(format!(
                "{} {} missing from the window",
                self.stats.missing,
                pluralize("event", self.stats.missing)
            ));
        }
        if !quiet.is_empty() {
            lines.push(format!("   {}", quiet.join(", ")).dimmed().to_string());
        }

        for failure in &self.failures {
            lines.push(format!("   {}", failure.render()));
        }

        lines.join("\n")
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
