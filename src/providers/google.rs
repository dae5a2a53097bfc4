//! Google Calendar v3 over REST, across every configured calendar.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use notion_gcal_core::normalize::{google_time, parse_timestamp};
use notion_gcal_core::{
    CalendarIdentity, EventDraft, EventRecord, EventStore, EventTime, Settings, StoreError,
    StoreResult, SyncWindow,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::{handle_empty, handle_response, http_client, network};
use crate::config::GoogleConfig;

const GOOGLE_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const MAX_RESULTS: &str = "250";
const SOURCE_TITLE: &str = "Notion Link";

pub struct GoogleCalendarClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
    calendar_ids: Vec<String>,
    /// IANA name sent with timed event bounds
    timezone: String,
    offset: FixedOffset,
}

impl GoogleCalendarClient {
    /// Lists events from every calendar `identity` knows, in table order.
    pub fn new(
        config: &GoogleConfig,
        settings: &Settings,
        identity: &CalendarIdentity,
        timeout: Duration,
    ) -> StoreResult<Self> {
        Ok(GoogleCalendarClient {
            client: http_client(timeout)?,
            access_token: config.access_token.clone(),
            base_url: GOOGLE_API_BASE.to_string(),
            calendar_ids: identity.calendar_ids().to_vec(),
            timezone: settings.timezone.clone(),
            offset: settings.offset(),
        })
    }

    #[cfg(test)]
    fn new_with_base_url(settings: &Settings, base_url: &str) -> Self {
        let identity = CalendarIdentity::from_settings(settings)
            .expect("test settings have a valid calendar table");
        GoogleCalendarClient {
            client: reqwest::Client::new(),
            access_token: "ya29.token".to_string(),
            base_url: base_url.to_string(),
            calendar_ids: identity.calendar_ids().to_vec(),
            timezone: settings.timezone.clone(),
            offset: settings.offset(),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
    }

    fn events_path(calendar_id: &str) -> String {
        format!("/calendars/{}/events", urlencoding::encode(calendar_id))
    }

    fn event_path(calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            Self::events_path(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// One calendar's events in the window, recurring events expanded.
    #[instrument(skip(self), level = "debug")]
    async fn list_calendar(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
    ) -> StoreResult<Vec<EventRecord>> {
        let path = Self::events_path(calendar_id);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.request(Method::GET, &path).query(&[
                ("timeMin", time_min),
                ("timeMax", time_max),
                ("singleEvents", "true"),
                ("maxResults", MAX_RESULTS),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(network)?;
            let list: EventList = handle_response(response).await?;

            for item in list.items {
                let event: ApiEvent = match serde_json::from_value(item) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(calendar_id, error = %e, "skipping malformed event");
                        continue;
                    }
                };
                if event.status == "cancelled" {
                    continue;
                }
                match event.into_record(calendar_id) {
                    Ok(record) => events.push(record),
                    Err(e) => warn!(calendar_id, error = %e, "skipping malformed event"),
                }
            }

            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(calendar_id, count = events.len(), "listed events");
        Ok(events)
    }

    fn event_body(&self, draft: &EventDraft) -> Value {
        let mut body = json!({
            "summary": draft.summary,
            "description": draft.description,
            "location": draft.location,
            "start": google_time(&draft.start, &self.timezone),
            "end": google_time(&draft.end, &self.timezone),
        });
        if let Some(url) = &draft.source_url {
            body["source"] = json!({ "title": SOURCE_TITLE, "url": url });
        }
        body
    }
}

#[async_trait]
impl EventStore for GoogleCalendarClient {
    async fn list_events(&self, window: &SyncWindow) -> StoreResult<Vec<EventRecord>> {
        let time_min = window.after_at(self.offset).to_rfc3339();
        let time_max = window.before_at(self.offset).to_rfc3339();

        let mut events = Vec::new();
        for calendar_id in &self.calendar_ids {
            events.extend(self.list_calendar(calendar_id, &time_min, &time_max).await?);
        }
        Ok(events)
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        draft: &EventDraft,
    ) -> StoreResult<EventRecord> {
        let response = self
            .request(Method::POST, &Self::events_path(calendar_id))
            .json(&self.event_body(draft))
            .send()
            .await
            .map_err(network)?;
        let created: ApiEvent = handle_response(response).await?;

        created.into_record(calendar_id)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        draft: &EventDraft,
    ) -> StoreResult<()> {
        let response = self
            .request(Method::PUT, &Self::event_path(calendar_id, event_id))
            .json(&self.event_body(draft))
            .send()
            .await
            .map_err(network)?;

        handle_empty(response).await
    }

    async fn move_event(&self, from: &str, event_id: &str, to: &str) -> StoreResult<()> {
        let response = self
            .request(
                Method::POST,
                &format!("{}/move", Self::event_path(from, event_id)),
            )
            .query(&[("destination", to)])
            .send()
            .await
            .map_err(network)?;

        handle_empty(response).await
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> StoreResult<()> {
        let response = self
            .request(Method::DELETE, &Self::event_path(calendar_id, event_id))
            .send()
            .await
            .map_err(network)?;

        match handle_empty(response).await {
            Err(e) if e.is_not_found() => {
                debug!(calendar_id, event_id, "event already deleted");
                Ok(())
            }
            result => result,
        }
    }
}

// Response shapes

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventList {
    #[serde(default)]
    items: Vec<Value>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    location: String,
    start: Option<ApiTime>,
    end: Option<ApiTime>,
    #[serde(default)]
    status: String,
    updated: Option<String>,
    source: Option<ApiSource>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTime {
    date: Option<NaiveDate>,
    date_time: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Deserialize)]
struct ApiSource {
    url: Option<String>,
}

impl ApiTime {
    fn into_event_time(self) -> Option<EventTime> {
        match (self.date_time, self.date) {
            (Some(dt), _) => Some(EventTime::DateTime(dt)),
            (None, Some(d)) => Some(EventTime::Date(d)),
            (None, None) => None,
        }
    }
}

impl ApiEvent {
    fn into_record(self, calendar_id: &str) -> StoreResult<EventRecord> {
        let start = self
            .start
            .and_then(ApiTime::into_event_time)
            .ok_or_else(|| StoreError::Parse(format!("event {} has no start", self.id)))?;
        let end = self
            .end
            .and_then(ApiTime::into_event_time)
            .ok_or_else(|| StoreError::Parse(format!("event {} has no end", self.id)))?;
        let updated = self
            .updated
            .as_deref()
            .and_then(parse_timestamp)
            .ok_or_else(|| StoreError::Parse(format!("event {} has no updated time", self.id)))?;

        Ok(EventRecord {
            id: self.id,
            summary: self.summary,
            start,
            end,
            description: self.description,
            location: self.location,
            calendar_id: calendar_id.to_string(),
            updated,
            source_url: self.source.and_then(|s| s.url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notion_gcal_core::CalendarEntry;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings() -> Settings {
        Settings::new(
            "Australia/Perth",
            "+08:00",
            vec![
                CalendarEntry {
                    name: "Personal".to_string(),
                    id: "primary".to_string(),
                },
                CalendarEntry {
                    name: "Team".to_string(),
                    id: "team".to_string(),
                },
            ],
        )
    }

    fn window() -> SyncWindow {
        SyncWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
    }

    fn timed_event(id: &str, summary: &str) -> Value {
        json!({
            "kind": "calendar#event",
            "id": id,
            "status": "confirmed",
            "summary": summary,
            "updated": "2024-01-04T02:00:00.000Z",
            "start": { "dateTime": "2024-01-05T09:00:00+08:00", "timeZone": "Australia/Perth" },
            "end": { "dateTime": "2024-01-05T10:00:00+08:00", "timeZone": "Australia/Perth" }
        })
    }

    fn draft() -> EventDraft {
        EventDraft {
            summary: "Dentist".to_string(),
            start: EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            end: EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 6).unwrap()),
            description: "Bring referral".to_string(),
            location: String::new(),
            source_url: Some("https://www.notion.so/page-1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_events_across_calendars() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("pageToken", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "evt-2",
                    "status": "confirmed",
                    "summary": "Holiday",
                    "updated": "2024-01-04T03:00:00.000Z",
                    "start": { "date": "2024-01-08" },
                    "end": { "date": "2024-01-10" },
                    "source": { "title": "Notion Link", "url": "https://www.notion.so/page-2" }
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .and(header("Authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [timed_event("evt-1", "Dentist")],
                "nextPageToken": "page-2"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/calendars/team/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    timed_event("evt-3", "Standup"),
                    { "id": "evt-4", "status": "cancelled" },
                    { "id": "evt-5", "status": "confirmed", "updated": "2024-01-04T03:00:00.000Z" }
                ]
            })))
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url(&settings(), &server.uri());
        let events = client.list_events(&window()).await.unwrap();

        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["evt-1", "evt-2", "evt-3"]);

        assert_eq!(events[0].calendar_id, "primary");
        assert_eq!(
            events[0].start,
            EventTime::DateTime(DateTime::parse_from_rfc3339("2024-01-05T09:00:00+08:00").unwrap())
        );
        assert_eq!(
            events[1].end,
            EventTime::Date(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap())
        );
        assert_eq!(
            events[1].source_url.as_deref(),
            Some("https://www.notion.so/page-2")
        );
        assert_eq!(events[2].calendar_id, "team");
    }

    #[tokio::test]
    async fn test_create_event_sends_source_and_timezone() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/team/events"))
            .and(body_partial_json(json!({
                "summary": "Dentist",
                "start": { "date": "2024-01-05" },
                "end": { "date": "2024-01-06" },
                "source": { "title": "Notion Link", "url": "https://www.notion.so/page-1" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt-new",
                "status": "confirmed",
                "summary": "Dentist",
                "updated": "2024-01-10T10:00:00.000Z",
                "start": { "date": "2024-01-05" },
                "end": { "date": "2024-01-06" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url(&settings(), &server.uri());
        let created = client.create_event("team", &draft()).await.unwrap();

        assert_eq!(created.id, "evt-new");
        assert_eq!(created.calendar_id, "team");
    }

    #[test]
    fn test_timed_body_carries_timezone() {
        let client = GoogleCalendarClient::new_with_base_url(&settings(), "http://localhost");
        let mut draft = draft();
        draft.start = EventTime::DateTime(
            DateTime::parse_from_rfc3339("2024-01-05T09:00:00+08:00").unwrap(),
        );
        draft.end = EventTime::DateTime(
            DateTime::parse_from_rfc3339("2024-01-05T10:00:00+08:00").unwrap(),
        );
        draft.source_url = None;

        let body = client.event_body(&draft);

        assert_eq!(body["start"]["dateTime"], "2024-01-05T09:00:00+08:00");
        assert_eq!(body["start"]["timeZone"], "Australia/Perth");
        assert!(body.get("source").is_none());
    }

    #[tokio::test]
    async fn test_move_event_targets_destination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events/evt-1/move"))
            .and(query_param("destination", "team"))
            .respond_with(ResponseTemplate::new(200).set_body_json(timed_event("evt-1", "Dentist")))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url(&settings(), &server.uri());
        client.move_event("primary", "evt-1", "team").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_event() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt-gone"))
            .respond_with(ResponseTemplate::new(410))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt-404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url(&settings(), &server.uri());
        client.delete_event("primary", "evt-gone").await.unwrap();
        client.delete_event("primary", "evt-404").await.unwrap();
        client.delete_event("primary", "evt-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt-1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url(&settings(), &server.uri());
        let err = client.delete_event("primary", "evt-1").await.unwrap_err();

        assert_eq!(
            err,
            StoreError::Api {
                status: 500,
                message: "backend error".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/calendars/primary/events/evt-1"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "12"))
            .mount(&server)
            .await;

        let client = GoogleCalendarClient::new_with_base_url(&settings(), &server.uri());
        let err = client
            .update_event("primary", "evt-1", &draft())
            .await
            .unwrap_err();

        assert_eq!(err, StoreError::RateLimited(12));
    }
}
