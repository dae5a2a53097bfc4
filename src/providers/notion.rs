//! Notion task database over the public REST API.
//!
//! Pages are parsed into `TaskRecord`s using the column names from
//! `[sync.properties]`; writes only ever touch the columns they change.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use notion_gcal_core::normalize::{notion_date_string, parse_timestamp};
use notion_gcal_core::{
    EventTime, PropertyNames, Settings, StoreError, StoreResult, SyncWindow, TaskDate, TaskDraft,
    TaskRecord, TaskStore, TaskUpdate,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument, warn};

use super::{handle_empty, handle_response, http_client, network};
use crate::config::NotionConfig;

const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const PAGE_SIZE: u32 = 100;
/// Notion rejects rich text objects whose content exceeds this many characters
const MAX_TEXT_LENGTH: usize = 2000;

pub struct NotionClient {
    client: reqwest::Client,
    token: String,
    api_version: String,
    database_id: String,
    base_url: String,
    properties: PropertyNames,
    offset: FixedOffset,
}

impl NotionClient {
    pub fn new(config: &NotionConfig, settings: &Settings, timeout: Duration) -> StoreResult<Self> {
        Ok(NotionClient {
            client: http_client(timeout)?,
            token: config.token.clone(),
            api_version: config.api_version.clone(),
            database_id: config.database_id.clone(),
            base_url: NOTION_API_BASE.to_string(),
            properties: settings.properties.clone(),
            offset: settings.offset(),
        })
    }

    #[cfg(test)]
    fn new_with_base_url(config: &NotionConfig, settings: &Settings, base_url: &str) -> Self {
        NotionClient {
            client: reqwest::Client::new(),
            token: config.token.clone(),
            api_version: config.api_version.clone(),
            database_id: config.database_id.clone(),
            base_url: base_url.to_string(),
            properties: settings.properties.clone(),
            offset: settings.offset(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
    }

    /// Run a database query, following `next_cursor` until exhausted.
    #[instrument(skip(self, filter), level = "debug")]
    async fn query(&self, filter: Value) -> StoreResult<Vec<TaskRecord>> {
        let path = format!("/databases/{}/query", urlencoding::encode(&self.database_id));
        let mut tasks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "filter": &filter, "page_size": PAGE_SIZE });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response = self
                .request(Method::POST, &path)
                .json(&body)
                .send()
                .await
                .map_err(network)?;
            let page: QueryResponse = handle_response(response).await?;

            for result in page.results {
                let id = result.id.clone();
                match parse_page(result, &self.properties) {
                    Ok(task) => tasks.push(task),
                    Err(e) => warn!(page_id = %id, error = %e, "skipping unreadable page"),
                }
            }

            match page.next_cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        debug!(count = tasks.len(), "queried notion database");
        Ok(tasks)
    }

    /// Tasks starting before the window ends and ending on or after it
    /// starts. Flagged tasks are only returned while still paired.
    fn window_filter(&self, window: &SyncWindow) -> Value {
        let p = &self.properties;
        json!({
            "and": [
                {
                    "property": p.date,
                    "date": { "before": notion_timestamp(window.before_at(self.offset)) }
                },
                {
                    "property": p.end_date,
                    "formula": {
                        "date": { "on_or_after": notion_timestamp(window.after_at(self.offset)) }
                    }
                },
                {
                    "or": [
                        { "property": p.delete, "checkbox": { "equals": false } },
                        { "property": p.event_id, "rich_text": { "is_not_empty": true } }
                    ]
                }
            ]
        })
    }

    fn update_properties(&self, update: &TaskUpdate) -> Map<String, Value> {
        let p = &self.properties;
        let mut props = Map::new();

        if let Some(title) = &update.title {
            props.insert(p.title.clone(), title_value(title));
        }
        if let Some(date) = &update.date {
            props.insert(p.date.clone(), date_value(date));
        }
        if let Some(location) = &update.location {
            props.insert(p.location.clone(), text_value(location));
        }
        if let Some(name) = &update.calendar_name {
            props.insert(p.calendar.clone(), select_value(name));
        }
        if let Some(event_id) = &update.event_id {
            props.insert(p.event_id.clone(), text_value(event_id));
        }
        if let Some(synced) = &update.last_synced {
            props.insert(p.sync_time.clone(), text_value(synced));
        }

        props
    }

    async fn patch_page(&self, page_id: &str, properties: Map<String, Value>) -> StoreResult<()> {
        let response = self
            .request(Method::PATCH, &format!("/pages/{}", urlencoding::encode(page_id)))
            .json(&json!({ "properties": properties }))
            .send()
            .await
            .map_err(network)?;

        handle_empty(response).await
    }
}

#[async_trait]
impl TaskStore for NotionClient {
    async fn list_tasks(&self, window: &SyncWindow) -> StoreResult<Vec<TaskRecord>> {
        self.query(self.window_filter(window)).await
    }

    async fn list_tasks_by_event_id(&self, event_id: &str) -> StoreResult<Vec<TaskRecord>> {
        self.query(json!({
            "property": self.properties.event_id,
            "rich_text": { "equals": event_id }
        }))
        .await
    }

    async fn create_task(&self, draft: &TaskDraft) -> StoreResult<TaskRecord> {
        let p = &self.properties;
        let mut props = Map::new();
        props.insert(p.title.clone(), title_value(&draft.title));
        props.insert(p.date.clone(), date_value(&draft.date));
        props.insert(p.extra_info.clone(), text_value(&draft.extra_info));
        props.insert(p.location.clone(), text_value(&draft.location));
        props.insert(p.calendar.clone(), select_value(&draft.calendar_name));
        props.insert(p.event_id.clone(), text_value(&draft.event_id));
        props.insert(p.sync_time.clone(), text_value(&draft.last_synced));

        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": props,
        });
        let response = self
            .request(Method::POST, "/pages")
            .json(&body)
            .send()
            .await
            .map_err(network)?;
        let page: Page = handle_response(response).await?;

        parse_page(page, &self.properties)
    }

    async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> StoreResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        self.patch_page(task_id, self.update_properties(update)).await
    }

    async fn mark_deleted(&self, task_id: &str) -> StoreResult<()> {
        let p = &self.properties;
        let mut props = Map::new();
        props.insert(p.event_id.clone(), text_value(""));
        props.insert(p.sync_time.clone(), text_value(""));
        props.insert(p.delete.clone(), json!({ "checkbox": true }));

        self.patch_page(task_id, props).await
    }
}

// Response shapes

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Page {
    id: String,
    #[serde(default)]
    url: Option<String>,
    last_edited_time: String,
    #[serde(default)]
    properties: HashMap<String, PropertyValue>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Date {
        date: Option<DateValue>,
    },
    Select {
        select: Option<SelectValue>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
}

#[derive(Debug, Deserialize)]
struct DateValue {
    start: String,
    end: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SelectValue {
    name: String,
}

impl Page {
    /// Concatenated plain text of a title or rich text column.
    fn text(&self, name: &str) -> String {
        match self.properties.get(name) {
            Some(PropertyValue::Title { title: parts } | PropertyValue::RichText { rich_text: parts }) => {
                parts.iter().map(|p| p.plain_text.as_str()).collect()
            }
            _ => String::new(),
        }
    }

    fn select(&self, name: &str) -> Option<String> {
        match self.properties.get(name) {
            Some(PropertyValue::Select {
                select: Some(select),
            }) => Some(select.name.clone()),
            _ => None,
        }
    }

    fn checkbox(&self, name: &str) -> bool {
        matches!(
            self.properties.get(name),
            Some(PropertyValue::Checkbox { checkbox: true })
        )
    }

    fn date(&self, name: &str) -> StoreResult<Option<TaskDate>> {
        let Some(PropertyValue::Date { date: Some(value) }) = self.properties.get(name) else {
            return Ok(None);
        };

        let start = parse_event_time(&value.start).ok_or_else(|| {
            StoreError::Parse(format!("page {}: bad date '{}'", self.id, value.start))
        })?;
        let end = match &value.end {
            Some(end) => Some(parse_event_time(end).ok_or_else(|| {
                StoreError::Parse(format!("page {}: bad end date '{end}'", self.id))
            })?),
            None => None,
        };

        Ok(Some(TaskDate::new(start, end)))
    }
}

/// Turn a Notion page into a task. Fails when the date column is empty
/// or unreadable, since nothing can be synced without it.
pub fn parse_page(page: Page, properties: &PropertyNames) -> StoreResult<TaskRecord> {
    let date = page.date(&properties.date)?.ok_or_else(|| {
        StoreError::Parse(format!("page {} has no '{}' value", page.id, properties.date))
    })?;
    let last_edited = parse_timestamp(&page.last_edited_time).ok_or_else(|| {
        StoreError::Parse(format!(
            "page {}: bad last_edited_time '{}'",
            page.id, page.last_edited_time
        ))
    })?;

    let event_id = Some(page.text(&properties.event_id)).filter(|id| !id.is_empty());

    Ok(TaskRecord {
        title: page.text(&properties.title),
        location: page.text(&properties.location),
        extra_info: page.text(&properties.extra_info),
        calendar_name: page.select(&properties.calendar),
        event_id,
        last_synced: parse_timestamp(&page.text(&properties.sync_time)),
        delete_requested: page.checkbox(&properties.delete),
        date,
        last_edited,
        url: page.url,
        id: page.id,
    })
}

/// Notion dates are either `YYYY-MM-DD` or a full RFC 3339 timestamp.
fn parse_event_time(s: &str) -> Option<EventTime> {
    if s.len() == 10 {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(EventTime::Date)
    } else {
        DateTime::parse_from_rfc3339(s).ok().map(EventTime::DateTime)
    }
}

fn notion_timestamp(dt: DateTime<FixedOffset>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string()
}

// Property builders

fn rich_text(content: &str) -> Value {
    let chars: Vec<char> = content.chars().collect();
    let parts: Vec<Value> = chars
        .chunks(MAX_TEXT_LENGTH)
        .map(|chunk| {
            let part: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": part } })
        })
        .collect();
    Value::Array(parts)
}

fn title_value(content: &str) -> Value {
    json!({ "title": rich_text(content) })
}

fn text_value(content: &str) -> Value {
    json!({ "rich_text": rich_text(content) })
}

fn select_value(name: &str) -> Value {
    json!({ "select": { "name": name } })
}

fn date_value(date: &TaskDate) -> Value {
    json!({
        "date": {
            "start": notion_date_string(&date.start),
            "end": date.end.as_ref().map(notion_date_string),
        }
    })
}
