//! Google Calendar API client.
//!
//! Low-level HTTP access to the Calendar API v3: calendar list, event
//! listing, and single-event CRUD. Responses are returned as API types;
//! turning them into calendars and appointments is the provider's job.

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base: String,
    page_size: u32,
}

impl GoogleCalendarClient {
    /// Creates a client from the provider configuration. Does not contact
    /// the API.
    pub fn new(config: &GoogleConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            access_token: config.access_token.clone(),
            base: config.base().to_string(),
            page_size: config.page_size,
        })
    }

    /// Lists every calendar in the user's calendar list.
    pub async fn list_calendars(&self) -> ProviderResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", self.base);
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http_client
                .get(&url)
                .query(&[("maxResults", self.page_size.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: CalendarListResponse = self.send_json(request).await?;
            entries.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} calendar list entries", entries.len());
        Ok(entries)
    }

    /// Lists the events of a calendar, following pagination.
    ///
    /// Recurring events are expanded into their instances.
    pub async fn list_events(&self, calendar_id: &str) -> ProviderResult<Vec<ApiEvent>> {
        let url = self.events_url(calendar_id);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.http_client.get(&url).query(&[
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", self.page_size.to_string()),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page: EventListResponse = self.send_json(request).await?;
            events.extend(page.items);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("fetched {} events from calendar {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Fetches one event as raw JSON, so that fields this crate does not
    /// model survive an update.
    pub async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> ProviderResult<serde_json::Value> {
        let request = self.http_client.get(self.event_url(calendar_id, event_id));
        self.send_json(request).await
    }

    /// Creates an event.
    pub async fn insert_event(&self, calendar_id: &str, body: &EventBody) -> ProviderResult<()> {
        let request = self
            .http_client
            .post(self.events_url(calendar_id))
            .header("Content-Type", "application/json")
            .body(encode(body)?);
        self.send(request).await.map(drop)
    }

    /// Replaces an event with `body`.
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        body: &serde_json::Value,
    ) -> ProviderResult<()> {
        let request = self
            .http_client
            .put(self.event_url(calendar_id, event_id))
            .header("Content-Type", "application/json")
            .body(encode(body)?);
        self.send(request).await.map(drop)
    }

    /// Deletes an event.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ProviderResult<()> {
        let request = self.http_client.delete(self.event_url(calendar_id, event_id));
        self.send(request).await.map(drop)
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ProviderResult<T> {
        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }

    async fn send(&self, request: RequestBuilder) -> ProviderResult<Response> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, retry_after, &body))
    }
}

/// Maps a non-success status to a provider error.
fn status_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => {
            ProviderError::authentication("access token expired or invalid")
        }
        StatusCode::FORBIDDEN if body.contains("rateLimitExceeded") => {
            ProviderError::rate_limited("rate limit exceeded")
        }
        StatusCode::FORBIDDEN => ProviderError::authorization("access denied to calendar"),
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            ProviderError::not_found(format!("API error ({})", status))
        }
        StatusCode::TOO_MANY_REQUESTS => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        s if s.is_client_error() => {
            ProviderError::bad_request(format!("API error ({}): {}", status, body))
        }
        _ => ProviderError::server(format!("API error ({}): {}", status, body)),
    }
}

fn encode<T: Serialize>(body: &T) -> ProviderResult<String> {
    serde_json::to_string(body)
        .map_err(|e| ProviderError::internal(format!("failed to encode request: {}", e)))
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color_id: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
    pub status: Option<String>,
}

/// Event boundary, as read from and written to the API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Request body for events.insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    pub start: ApiEventTime,
    pub end: ApiEventTime,
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// A calendar from the calendar list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar ID.
    pub id: String,
    /// The calendar summary (name).
    #[serde(default)]
    pub summary: String,
    /// Name the user gave the calendar, if any.
    pub summary_override: Option<String>,
    pub description: Option<String>,
    /// Whether this is the primary calendar.
    #[serde(default)]
    pub primary: bool,
    /// `owner`, `writer`, `reader` or `freeBusyReader`.
    pub access_role: Option<String>,
    /// Background color, `#rrggbb`.
    pub background_color: Option<String>,
}
