//! Google Calendar provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait for Google Calendar.

use chrono::{Days, Local, TimeZone};
use serde_json::{Map, Value};
use tracing::{debug, info};

use calhub_core::{AccessRights, Appointment, AppointmentId, Calendar, Color};

use crate::error::{ProviderError, ProviderResult};
use crate::normalize::{RawAppointment, RawEventTime, normalize_appointments};
use crate::provider::{BoxFuture, CalendarProvider, target_calendar};

use super::client::{ApiEvent, ApiEventTime, CalendarListEntry, EventBody, GoogleCalendarClient};
use super::config::GoogleConfig;

/// Google Calendar provider.
///
/// Talks to the Calendar API v3 with a bearer access token. Construction
/// only validates the configuration; the API is first contacted by the
/// first listing or write.
#[derive(Debug)]
pub struct GoogleProvider {
    config: GoogleConfig,
    display_name: String,
    client: GoogleCalendarClient,
}

impl GoogleProvider {
    /// Creates a new Google provider with the given configuration.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let display_name = config.provider_name();
        let client =
            GoogleCalendarClient::new(&config).map_err(|e| e.with_provider(&display_name))?;

        info!(provider = %display_name, "Google provider configured");
        Ok(Self {
            config,
            display_name,
            client,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    fn wanted(&self, entry: &CalendarListEntry) -> bool {
        self.config.calendar_ids.is_empty() || self.config.calendar_ids.contains(&entry.id)
    }

    async fn fetch_calendars(&self) -> ProviderResult<Vec<Calendar>> {
        let entries = self.client.list_calendars().await?;
        Ok(entries
            .iter()
            .filter(|e| self.wanted(e))
            .map(|e| calendar_from_entry(&self.display_name, e))
            .collect())
    }

    async fn fetch_appointments(&self, calendar: &Calendar) -> ProviderResult<Vec<Appointment>> {
        let events = self.client.list_events(&calendar.calendar_id).await?;
        let raws = events.into_iter().filter_map(raw_from_event);
        Ok(normalize_appointments(raws, calendar))
    }

    async fn insert(&self, appointment: &Appointment) -> ProviderResult<()> {
        let calendar = target_calendar(&self.display_name, appointment)?;
        let body = event_body_in(appointment, &Local);
        debug!(calendar = %calendar.calendar_id, id = %appointment.id, "inserting event");
        self.client.insert_event(&calendar.calendar_id, &body).await
    }

    async fn update(&self, appointment: &Appointment) -> ProviderResult<()> {
        let calendar = target_calendar(&self.display_name, appointment)?;
        let id = appointment.id.as_str();

        let mut event = self.client.get_event(&calendar.calendar_id, id).await?;
        apply_to_event_in(&mut event, appointment, &Local)?;

        debug!(calendar = %calendar.calendar_id, id, "updating event");
        self.client
            .update_event(&calendar.calendar_id, id, &event)
            .await
    }

    async fn remove(&self, appointment: &Appointment) -> ProviderResult<()> {
        let calendar = target_calendar(&self.display_name, appointment)?;
        debug!(calendar = %calendar.calendar_id, id = %appointment.id, "deleting event");
        self.client
            .delete_event(&calendar.calendar_id, appointment.id.as_str())
            .await
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        &self.display_name
    }

    fn accepts_id(&self, id: &AppointmentId) -> bool {
        is_valid_event_id(id.as_str())
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
        Box::pin(async move {
            self.fetch_calendars()
                .await
                .map_err(|e| e.with_provider(&self.display_name))
        })
    }

    fn list_appointments<'a>(
        &'a self,
        calendar: &'a Calendar,
    ) -> BoxFuture<'a, ProviderResult<Vec<Appointment>>> {
        Box::pin(async move {
            self.fetch_appointments(calendar)
                .await
                .map_err(|e| e.with_provider(&self.display_name))
        })
    }

    fn insert_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.insert(appointment)
                .await
                .map_err(|e| e.with_provider(&self.display_name))
        })
    }

    fn update_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.update(appointment)
                .await
                .map_err(|e| e.with_provider(&self.display_name))
        })
    }

    fn remove_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move {
            self.remove(appointment)
                .await
                .map_err(|e| e.with_provider(&self.display_name))
        })
    }
}

/// Builds a calendar from a calendar list entry.
///
/// Readers (including free/busy readers) get read access, owners and
/// writers get write access.
fn calendar_from_entry(provider: &str, entry: &CalendarListEntry) -> Calendar {
    let access = match entry.access_role.as_deref() {
        Some("reader") | Some("freeBusyReader") => AccessRights::Read,
        _ => AccessRights::Write,
    };
    let name = entry
        .summary_override
        .clone()
        .unwrap_or_else(|| entry.summary.clone());

    let mut calendar = Calendar::new(provider, &entry.id, name).with_access(access);
    calendar.description = entry.description.clone();
    calendar.color = entry
        .background_color
        .as_deref()
        .and_then(|c| c.parse::<Color>().ok());
    calendar
}

/// Converts an API event. Cancelled and id-less events are dropped.
fn raw_from_event(event: ApiEvent) -> Option<RawAppointment> {
    if event.status.as_deref() == Some("cancelled") {
        return None;
    }
    let id = event.id?;

    let parse = |t: Option<ApiEventTime>| {
        t.and_then(|t| RawEventTime::parse(t.date.as_deref(), t.date_time.as_deref()))
    };

    Some(RawAppointment {
        id,
        start: parse(event.start),
        end: parse(event.end),
        summary: event.summary,
        description: event.description,
        location: event.location,
        color_id: event.color_id,
    })
}

/// Event boundaries for an appointment, with all-day dates taken in `tz`.
fn event_times_in<Tz: TimeZone>(appointment: &Appointment, tz: &Tz) -> (ApiEventTime, ApiEventTime)
where
    Tz::Offset: std::fmt::Display,
{
    if appointment.all_day {
        let start = appointment.start.with_timezone(tz).date_naive();
        let mut end = appointment.end.with_timezone(tz).date_naive();
        if end <= start {
            end = start.checked_add_days(Days::new(1)).unwrap_or(start);
        }
        let date = |d: chrono::NaiveDate| ApiEventTime {
            date: Some(d.format("%Y-%m-%d").to_string()),
            ..Default::default()
        };
        (date(start), date(end))
    } else {
        let timed = |dt: chrono::DateTime<chrono::Utc>| ApiEventTime {
            date_time: Some(dt.with_timezone(tz).to_rfc3339()),
            ..Default::default()
        };
        (timed(appointment.start), timed(appointment.end))
    }
}

fn color_id(appointment: &Appointment) -> Option<String> {
    (appointment.label_id > 0).then(|| appointment.label_id.to_string())
}

/// Google accepts client ids made of base32hex characters, 5 to 1024 long.
fn is_valid_event_id(id: &str) -> bool {
    (5..=1024).contains(&id.len())
        && id
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'v').contains(&b))
}

fn event_body_in<Tz: TimeZone>(appointment: &Appointment, tz: &Tz) -> EventBody
where
    Tz::Offset: std::fmt::Display,
{
    let (start, end) = event_times_in(appointment, tz);
    let id = appointment.id.as_str();
    EventBody {
        id: is_valid_event_id(id).then(|| id.to_string()),
        summary: appointment.subject.clone(),
        description: appointment.description.clone(),
        location: appointment.location.clone(),
        color_id: color_id(appointment),
        start,
        end,
    }
}

/// Overwrites the fields this crate owns on a fetched event, leaving the
/// rest (attendees, reminders, recurrence) untouched.
fn apply_to_event_in<Tz: TimeZone>(
    event: &mut Value,
    appointment: &Appointment,
    tz: &Tz,
) -> ProviderResult<()>
where
    Tz::Offset: std::fmt::Display,
{
    let object = event
        .as_object_mut()
        .ok_or_else(|| ProviderError::invalid_response("event is not a JSON object"))?;

    let (start, end) = event_times_in(appointment, tz);
    let encode = |t: ApiEventTime| {
        serde_json::to_value(t)
            .map_err(|e| ProviderError::internal(format!("failed to encode time: {}", e)))
    };
    object.insert("start".into(), encode(start)?);
    object.insert("end".into(), encode(end)?);

    set_or_remove(object, "summary", appointment.subject.clone());
    set_or_remove(object, "description", appointment.description.clone());
    set_or_remove(object, "location", appointment.location.clone());
    set_or_remove(object, "colorId", color_id(appointment));
    Ok(())
}

fn set_or_remove(object: &mut Map<String, Value>, key: &str, value: Option<String>) {
    match value {
        Some(v) => {
            object.insert(key.to_string(), Value::String(v));
        }
        None => {
            object.remove(key);
        }
    }
}
