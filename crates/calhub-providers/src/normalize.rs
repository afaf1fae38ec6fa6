//! Backend event data to [`Appointment`] conversion.
//!
//! Backends describe event boundaries either as a full timestamp or as a bare
//! date. [`RawAppointment`] captures that shape before normalization, and
//! [`normalize_appointment`] turns it into an [`Appointment`]:
//!
//! 1. Date-only endpoints become local midnight of that date.
//! 2. `all_day` is derived, never taken from the backend: it holds exactly
//!    when neither endpoint carries a time of day.
//! 3. A date-only range with a zero-day span is widened to one day.
//! 4. The backend color id becomes `label_id` (unparseable ids map to 0).

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use tracing::warn;

use calhub_core::time::midnight_in;
use calhub_core::{Appointment, AppointmentId, Calendar};

/// An event boundary as the backend expresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEventTime {
    /// A timestamp with its offset.
    DateTime(DateTime<FixedOffset>),
    /// A date without a time of day.
    Date(NaiveDate),
}

impl RawEventTime {
    pub fn has_time_of_day(&self) -> bool {
        matches!(self, Self::DateTime(_))
    }

    /// Resolves to a UTC instant, reading bare dates as midnight in `tz`.
    pub fn to_utc_in<Tz: TimeZone>(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => dt.with_timezone(&Utc),
            Self::Date(date) => midnight_in(*date, tz),
        }
    }

    /// Parses the backend's `(date, dateTime)` pair. `dateTime` wins when both
    /// are present.
    pub fn parse(date: Option<&str>, date_time: Option<&str>) -> Option<Self> {
        if let Some(dt) = date_time {
            return DateTime::parse_from_rfc3339(dt)
                .map(Self::DateTime)
                .map_err(|e| warn!(value = dt, error = %e, "unparseable event timestamp"))
                .ok();
        }
        let date = date?;
        calhub_core::time::parse_date(date)
            .map(Self::Date)
            .or_else(|| {
                warn!(value = date, "unparseable event date");
                None
            })
    }
}

/// Event data from a backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAppointment {
    pub id: String,
    pub start: Option<RawEventTime>,
    pub end: Option<RawEventTime>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// Backend color category, e.g. Google's `colorId`.
    pub color_id: Option<String>,
}

impl RawAppointment {
    pub fn new(id: impl Into<String>, start: RawEventTime, end: RawEventTime) -> Self {
        Self {
            id: id.into(),
            start: Some(start),
            end: Some(end),
            summary: None,
            description: None,
            location: None,
            color_id: None,
        }
    }
}

/// Returns true when the pair describes an all-day event.
pub fn is_all_day(start: &RawEventTime, end: &RawEventTime) -> bool {
    !start.has_time_of_day() && !end.has_time_of_day()
}

/// Parses a backend color id into a label. Missing or invalid ids map to 0.
pub fn label_from_color_id(color_id: Option<&str>) -> u8 {
    color_id
        .and_then(|id| id.trim().parse::<u8>().ok())
        .unwrap_or(0)
}

/// Normalizes a raw event, reading bare dates in the local time zone.
///
/// Returns `None` (with a warning) when the event lacks a start or an end.
pub fn normalize_appointment(raw: RawAppointment, calendar: &Calendar) -> Option<Appointment> {
    normalize_appointment_in(raw, calendar, &Local)
}

/// Normalizes a raw event, reading bare dates in `tz`.
pub fn normalize_appointment_in<Tz: TimeZone>(
    raw: RawAppointment,
    calendar: &Calendar,
    tz: &Tz,
) -> Option<Appointment> {
    let (Some(start), Some(end)) = (raw.start, raw.end) else {
        warn!(
            id = %raw.id,
            calendar = %calendar.calendar_id,
            "event without start or end, skipping"
        );
        return None;
    };

    let all_day = is_all_day(&start, &end);
    let start_utc = start.to_utc_in(tz);
    let mut end_utc = end.to_utc_in(tz);
    if all_day && end_utc <= start_utc {
        end_utc = start_utc + Duration::days(1);
    }

    let mut appointment = Appointment::new(AppointmentId::new(raw.id), start_utc, end_utc)
        .with_all_day(all_day)
        .with_label(label_from_color_id(raw.color_id.as_deref()))
        .with_calendar(calendar.clone());
    appointment.subject = raw.summary;
    appointment.description = raw.description;
    appointment.location = raw.location;

    Some(appointment)
}

/// Normalizes a batch, dropping events that cannot be normalized.
pub fn normalize_appointments(
    raws: impl IntoIterator<Item = RawAppointment>,
    calendar: &Calendar,
) -> Vec<Appointment> {
    raws.into_iter()
        .filter_map(|raw| normalize_appointment(raw, calendar))
        .collect()
}
