mod config;
mod providers;
mod render;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{ArgGroup, Parser};
use notion_gcal_core::{CalendarIdentity, Engine, SyncMode, SyncWindow};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::providers::{GoogleCalendarClient, NotionClient};
use crate::render::Render;

#[derive(Parser)]
#[command(name = "notion-gcal-sync")]
#[command(about = "Two-way sync between a Notion task database and Google Calendar")]
#[command(group(ArgGroup::new("mode").multiple(false)))]
struct Cli {
    /// Two-way sync over a custom window: days back and days forward from today
    #[arg(short, long, num_args = 2, value_names = ["BACK", "FORWARD"], group = "mode")]
    timestamp: Option<Vec<u32>>,

    /// Overwrite Notion with Google Calendar (optionally over a custom window)
    #[arg(short, long, num_args = 0..=2, value_names = ["BACK", "FORWARD"], group = "mode")]
    google: Option<Vec<u32>>,

    /// Overwrite Google Calendar with Notion (optionally over a custom window)
    #[arg(short, long, num_args = 0..=2, value_names = ["BACK", "FORWARD"], group = "mode")]
    notion: Option<Vec<u32>>,

    /// Only delete events for tasks flagged for deletion
    #[arg(short, long, num_args = 0..=2, value_names = ["BACK", "FORWARD"], group = "mode")]
    delete: Option<Vec<u32>>,

    /// Config file (defaults to ~/.config/notion-gcal-sync/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// The selected mode and the day counts given with it, if any.
    fn mode(&self) -> (SyncMode, &[u32]) {
        if let Some(days) = &self.google {
            (SyncMode::ForcePull, days.as_slice())
        } else if let Some(days) = &self.notion {
            (SyncMode::ForcePush, days.as_slice())
        } else if let Some(days) = &self.delete {
            (SyncMode::DeleteOnly, days.as_slice())
        } else if let Some(days) = &self.timestamp {
            (SyncMode::Bidirectional, days.as_slice())
        } else {
            (SyncMode::Bidirectional, &[][..])
        }
    }
}

/// Either no window override, or both BACK and FORWARD.
fn parse_days(days: &[u32]) -> Result<Option<(i64, i64)>> {
    match days {
        [] => Ok(None),
        [back, forward] => Ok(Some((i64::from(*back), i64::from(*forward)))),
        _ => anyhow::bail!(
            "Expected BACK and FORWARD day counts, got {} value(s)",
            days.len()
        ),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let (mode, days) = cli.mode();
    let days = parse_days(days)?;

    let path = Config::resolve_path(cli.config.as_deref())?;
    let config = Config::load(&path)?;

    let timeout = config.http.timeout();
    let notion = NotionClient::new(&config.notion, &config.sync, timeout)
        .context("Failed to set up the Notion client")?;
    let identity =
        CalendarIdentity::from_settings(&config.sync).context("Invalid [sync] calendars")?;
    let google = GoogleCalendarClient::new(&config.google, &config.sync, &identity, timeout)
        .context("Failed to set up the Google Calendar client")?;
    let engine = Engine::new(config.sync, notion, google).context("Invalid [sync] settings")?;

    let window = match days {
        Some((back, forward)) => SyncWindow::around(Local::now().date_naive(), back, forward),
        None => engine.default_window(),
    };

    let summary = engine.run(mode, window).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.render());
    }

    if !summary.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_flags_is_bidirectional() {
        let cli = Cli::try_parse_from(["notion-gcal-sync"]).unwrap();
        let (mode, days) = cli.mode();
        assert_eq!(mode, SyncMode::Bidirectional);
        assert!(days.is_empty());
    }

    #[test]
    fn test_force_pull_with_window() {
        let cli = Cli::try_parse_from(["notion-gcal-sync", "-g", "3", "30"]).unwrap();
        let (mode, days) = cli.mode();
        assert_eq!(mode, SyncMode::ForcePull);
        assert_eq!(parse_days(days).unwrap(), Some((3, 30)));
    }

    #[test]
    fn test_delete_without_window() {
        let cli = Cli::try_parse_from(["notion-gcal-sync", "--delete", "--json"]).unwrap();
        let (mode, days) = cli.mode();
        assert_eq!(mode, SyncMode::DeleteOnly);
        assert_eq!(parse_days(days).unwrap(), None);
        assert!(cli.json);
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["notion-gcal-sync", "-g", "-n"]).is_err());
    }

    #[test]
    fn test_timestamp_needs_both_counts() {
        assert!(Cli::try_parse_from(["notion-gcal-sync", "-t", "3"]).is_err());
    }

    #[test]
    fn test_single_day_count_is_rejected() {
        let cli = Cli::try_parse_from(["notion-gcal-sync", "-n", "3"]).unwrap();
        let (mode, days) = cli.mode();
        assert_eq!(mode, SyncMode::ForcePush);
        assert!(parse_days(days).is_err());
    }
}
