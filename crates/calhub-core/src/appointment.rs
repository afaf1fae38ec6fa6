//! Appointment types.
//!
//! An [`Appointment`] is a single backend-agnostic event. Its identifier is
//! provided by the backend when read from a provider, or generated locally
//! with [`AppointmentId::generate`] for appointments created before their
//! first insert.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Calendar;

/// Opaque appointment identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(String);

impl AppointmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, locally unique identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppointmentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AppointmentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Reminder settings attached by the consumer.
///
/// The core never interprets the content. It only carries it so that edits
/// coming from a view do not drop it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderInfo(String);

impl ReminderInfo {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A single calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    /// True when the backend stores the event as a date-only range.
    pub all_day: bool,
    /// Display color category.
    pub label_id: u8,
    /// Owning calendar. `None` until a calendar has been assigned.
    pub calendar: Option<Calendar>,
    pub reminder: Option<ReminderInfo>,
}

impl Appointment {
    /// Creates a timed appointment with no calendar.
    pub fn new(id: impl Into<AppointmentId>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            subject: None,
            description: None,
            location: None,
            all_day: false,
            label_id: 0,
            calendar: None,
            reminder: None,
        }
    }

    /// Builder method to set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Builder method to mark the appointment as all-day.
    pub fn with_all_day(mut self, all_day: bool) -> Self {
        self.all_day = all_day;
        self
    }

    /// Builder method to set the label.
    pub fn with_label(mut self, label_id: u8) -> Self {
        self.label_id = label_id;
        self
    }

    /// Builder method to assign the owning calendar.
    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = Some(calendar);
        self
    }

    /// Builder method to attach reminder settings.
    pub fn with_reminder(mut self, reminder: ReminderInfo) -> Self {
        self.reminder = Some(reminder);
        self
    }

    /// Returns the owning provider's name, if a calendar is assigned.
    pub fn provider_name(&self) -> Option<&str> {
        self.calendar.as_ref().map(|c| c.provider_name.as_str())
    }

    /// Returns the subject, or a placeholder for untitled events.
    pub fn display_subject(&self) -> &str {
        match self.subject.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => "(No title)",
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, 0, 0).unwrap()
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = AppointmentId::generate();
        let b = AppointmentId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn builder_sets_fields() {
        let calendar = Calendar::new("Work", "w1", "Team");
        let appt = Appointment::new("42", at(10), at(11))
            .with_subject("Standup")
            .with_location("Room 1")
            .with_label(3)
            .with_calendar(calendar)
            .with_reminder(ReminderInfo::new("15m"));

        assert_eq!(appt.id.as_str(), "42");
        assert_eq!(appt.provider_name(), Some("Work"));
        assert_eq!(appt.display_subject(), "Standup");
        assert_eq!(appt.label_id, 3);
        assert_eq!(appt.duration(), Duration::hours(1));
        assert_eq!(appt.reminder.as_ref().map(|r| r.as_str()), Some("15m"));
    }

    #[test]
    fn untitled_display_subject() {
        let appt = Appointment::new("1", at(9), at(10)).with_subject("   ");
        assert_eq!(appt.display_subject(), "(No title)");
        assert_eq!(appt.provider_name(), None);
    }

    #[test]
    fn id_serializes_transparently() {
        let json = serde_json::to_string(&AppointmentId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
