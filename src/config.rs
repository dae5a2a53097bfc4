//! Configuration at ~/.config/notion-gcal-sync/config.toml
//!
//! Tokens may also come from the environment, e.g.
//! `NOTION_GCAL__NOTION__TOKEN` or `NOTION_GCAL__GOOGLE__ACCESS_TOKEN`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Environment, File};
use notion_gcal_core::Settings;
use serde::Deserialize;

const APP_DIR: &str = "notion-gcal-sync";
const ENV_PREFIX: &str = "NOTION_GCAL";
const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_notion_version() -> String {
    DEFAULT_NOTION_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub notion: NotionConfig,
    pub google: GoogleConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub sync: Settings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotionConfig {
    /// Internal integration token
    #[serde(default)]
    pub token: String,
    pub database_id: String,
    #[serde(default = "default_notion_version")]
    pub api_version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// OAuth access token with the calendar scope
    #[serde(default)]
    pub access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }

    /// The `--config` argument with `~` expanded, or the default location.
    pub fn resolve_path(arg: Option<&str>) -> Result<PathBuf> {
        match arg {
            Some(path) => Ok(PathBuf::from(shellexpand::tilde(path).into_owned())),
            None => Self::default_path(),
        }
    }

    /// Load and check the config. A missing file is created from the
    /// template and reported, since it needs tokens before it is usable.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            create_default_config(path)?;
            anyhow::bail!(
                "Created a config file at {}\n\n\
                Fill in your Notion token and database id, a Google access token\n\
                and your calendars, then run again.",
                path.display()
            );
        }

        let config: Config = config::Config::builder()
            .add_source(File::from(path.to_path_buf()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to read config file at {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.notion.token.trim().is_empty() {
            anyhow::bail!("Missing [notion] token (or {ENV_PREFIX}__NOTION__TOKEN)");
        }
        if self.notion.database_id.trim().is_empty() {
            anyhow::bail!("Missing [notion] database_id");
        }
        if self.google.access_token.trim().is_empty() {
            anyhow::bail!("Missing [google] access_token (or {ENV_PREFIX}__GOOGLE__ACCESS_TOKEN)");
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("[http] timeout_secs must be positive");
        }
        self.sync.validate().context("Invalid [sync] settings")?;
        Ok(())
    }
}

const DEFAULT_CONFIG: &str = r#"# notion-gcal-sync configuration

[notion]
# Internal integration token (or NOTION_GCAL__NOTION__TOKEN)
token = ""
database_id = ""
# api_version = "2022-06-28"

[google]
# OAuth access token with the calendar scope (or NOTION_GCAL__GOOGLE__ACCESS_TOKEN)
access_token = ""

[http]
# timeout_secs = 30

[sync]
# IANA timezone sent with timed events, and the matching UTC offset
timezone = "UTC"
timecode = "+00:00"

# Calendar used when a task has none selected (defaults to the first below)
# default_calendar = "Personal"

# default_event_length = 60        # minutes
# default_event_start = 8          # hour, for all-day tasks made timed
# convert_all_day_to_timed = false
# max_batch = 100                  # abort when either side returns more
# goback_days = 3
# goforward_days = 90
# readonly_calendar_patterns = ["@import.calendar.google.com"]

[[sync.calendars]]
name = "Personal"
id = "primary"

# Notion column names, if yours differ:
# [sync.properties]
# title = "Task Name"
# date = "Date"
# end_date = "GCal End Date"
# location = "Location"
# extra_info = "Extra Info"
# calendar = "Calendar"
# event_id = "GCal Event Id"
# sync_time = "GCal Sync Time"
# delete = "Delete from GCal?"
"#;

/// Write the commented template to `path`.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create config directory {}", parent.display()))?;
    }

    std::fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Could not write config file {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.notion.api_version, DEFAULT_NOTION_VERSION);
        assert_eq!(config.http.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.sync.calendars.len(), 1);
        assert!(config.sync.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_created_then_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Created a config file"));
        assert!(path.exists());

        // The template has no tokens yet
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("token"));
    }

    #[test]
    fn test_load_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
            [notion]
            token = "secret_abc"
            database_id = "db123"

            [google]
            access_token = "ya29.token"

            [http]
            timeout_secs = 10

            [sync]
            timezone = "Australia/Perth"
            timecode = "+08:00"
            default_calendar = "Work"
            max_batch = 50

            [[sync.calendars]]
            name = "Personal"
            id = "personal@group.calendar.google.com"

            [[sync.calendars]]
            name = "Work"
            id = "work@group.calendar.google.com"

            [sync.properties]
            title = "Name"
            "#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.notion.token, "secret_abc");
        assert_eq!(config.http.timeout(), Duration::from_secs(10));
        assert_eq!(config.sync.max_batch, 50);
        assert_eq!(config.sync.default_calendar.as_deref(), Some("Work"));
        assert_eq!(config.sync.properties.title, "Name");
        assert_eq!(config.sync.properties.delete, "Delete from GCal?");
    }

    #[test]
    fn test_invalid_sync_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
            [notion]
            token = "secret_abc"
            database_id = "db123"

            [google]
            access_token = "ya29.token"

            [sync]
            timezone = "Australia/Perth"
            timecode = "GMT+8"

            [[sync.calendars]]
            name = "Personal"
            id = "primary"
            "#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("timecode"));
    }

    #[test]
    fn test_resolve_path_expands_tilde() {
        let path = Config::resolve_path(Some("~/sync.toml")).unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("sync.toml"));
    }
}
