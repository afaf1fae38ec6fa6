//! In-process calendar backend.
//!
//! [`LocalProvider`] keeps calendars and appointments in memory. It backs
//! calendars that live only on this machine and doubles as a predictable
//! backend for tests and demos.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use calhub_core::{AccessRights, Appointment, AppointmentId, Calendar, Color};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, target_calendar};

/// Default name of the local provider.
pub const LOCAL_PROVIDER_NAME: &str = "local";

/// A calendar held by the local provider, with its appointments.
#[derive(Debug)]
struct LocalCalendar {
    calendar: Calendar,
    appointments: HashMap<AppointmentId, Appointment>,
}

/// In-memory calendar provider.
#[derive(Debug)]
pub struct LocalProvider {
    name: String,
    /// Calendars in creation order.
    calendars: RwLock<Vec<LocalCalendar>>,
}

impl LocalProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calendars: RwLock::new(Vec::new()),
        }
    }

    /// Adds a calendar and returns it, stamped with this provider's name.
    ///
    /// Adding a calendar id that already exists replaces its metadata and
    /// keeps its appointments.
    pub fn add_calendar(
        &self,
        calendar_id: impl Into<String>,
        name: impl Into<String>,
        access: AccessRights,
        color: Option<Color>,
    ) -> Calendar {
        let mut calendar = Calendar::new(&self.name, calendar_id, name).with_access(access);
        calendar.color = color;

        let mut calendars = self.calendars.write().unwrap_or_else(PoisonError::into_inner);
        match calendars
            .iter_mut()
            .find(|c| c.calendar.calendar_id == calendar.calendar_id)
        {
            Some(existing) => existing.calendar = calendar.clone(),
            None => calendars.push(LocalCalendar {
                calendar: calendar.clone(),
                appointments: HashMap::new(),
            }),
        }
        calendar
    }

    /// Builder form of [`add_calendar`](Self::add_calendar).
    pub fn with_calendar(
        self,
        calendar_id: impl Into<String>,
        name: impl Into<String>,
        access: AccessRights,
    ) -> Self {
        self.add_calendar(calendar_id, name, access, None);
        self
    }

    /// Number of appointments across all calendars.
    pub fn appointment_count(&self) -> usize {
        self.calendars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| c.appointments.len())
            .sum()
    }

    fn write_op<F>(&self, appointment: &Appointment, op: F) -> ProviderResult<()>
    where
        F: FnOnce(&mut HashMap<AppointmentId, Appointment>, Appointment) -> ProviderResult<()>,
    {
        let target = target_calendar(&self.name, appointment)?;
        let mut calendars = self.calendars.write().unwrap_or_else(PoisonError::into_inner);
        let local = calendars
            .iter_mut()
            .find(|c| c.calendar.calendar_id == target.calendar_id)
            .ok_or_else(|| {
                ProviderError::not_found(format!("no calendar '{}'", target.calendar_id))
                    .with_provider(&self.name)
            })?;

        if !local.calendar.is_writable() {
            return Err(ProviderError::read_only(format!(
                "calendar '{}' is read-only",
                target.calendar_id
            ))
            .with_provider(&self.name));
        }

        let mut stored = appointment.clone();
        stored.calendar = Some(local.calendar.clone());
        op(&mut local.appointments, stored).map_err(|e| e.with_provider(&self.name))
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new(LOCAL_PROVIDER_NAME)
    }
}

impl CalendarProvider for LocalProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
        let calendars: Vec<Calendar> = self
            .calendars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| c.calendar.clone())
            .collect();
        Box::pin(async move { Ok(calendars) })
    }

    fn list_appointments<'a>(
        &'a self,
        calendar: &'a Calendar,
    ) -> BoxFuture<'a, ProviderResult<Vec<Appointment>>> {
        let result = self
            .calendars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.calendar.calendar_id == calendar.calendar_id)
            .map(|c| {
                let mut appointments: Vec<_> = c.appointments.values().cloned().collect();
                appointments.sort_by(|a, b| a.start.cmp(&b.start).then(a.id.cmp(&b.id)));
                appointments
            })
            .ok_or_else(|| {
                ProviderError::not_found(format!("no calendar '{}'", calendar.calendar_id))
                    .with_provider(&self.name)
            });
        Box::pin(async move { result })
    }

    fn insert_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let result = self.write_op(appointment, |items, stored| {
            if items.contains_key(&stored.id) {
                return Err(ProviderError::bad_request(format!(
                    "appointment {} already exists",
                    stored.id
                )));
            }
            debug!(id = %stored.id, "inserting local appointment");
            items.insert(stored.id.clone(), stored);
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn update_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let result = self.write_op(appointment, |items, stored| {
            if !items.contains_key(&stored.id) {
                return Err(ProviderError::not_found(format!(
                    "no appointment {}",
                    stored.id
                )));
            }
            items.insert(stored.id.clone(), stored);
            Ok(())
        });
        Box::pin(async move { result })
    }

    fn remove_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        let result = self.write_op(appointment, |items, stored| {
            items
                .remove(&stored.id)
                .map(|_| ())
                .ok_or_else(|| ProviderError::not_found(format!("no appointment {}", stored.id)))
        });
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{TimeZone, Utc};

    fn provider() -> LocalProvider {
        LocalProvider::new("local")
            .with_calendar("home", "Home", AccessRights::Write)
            .with_calendar("holidays", "Holidays", AccessRights::Read)
    }

    fn appointment(id: &str, calendar: &Calendar) -> Appointment {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        Appointment::new(id, start, start + chrono::Duration::hours(1))
            .with_subject("Dentist")
            .with_calendar(calendar.clone())
    }

    #[tokio::test]
    async fn lists_calendars_in_creation_order() {
        let provider = provider();
        let calendars = provider.list_calendars().await.unwrap();
        let ids: Vec<_> = calendars.iter().map(|c| c.calendar_id.as_str()).collect();
        assert_eq!(ids, vec!["home", "holidays"]);
        assert!(calendars.iter().all(|c| c.provider_name == "local"));
    }

    #[tokio::test]
    async fn insert_update_remove() {
        let provider = provider();
        let home = provider.list_calendars().await.unwrap().remove(0);

        let appt = appointment("a1", &home);
        provider.insert_appointment(&appt).await.unwrap();
        assert_eq!(provider.appointment_count(), 1);

        let edited = appt.clone().with_subject("Dentist (moved)");
        provider.update_appointment(&edited).await.unwrap();
        let listed = provider.list_appointments(&home).await.unwrap();
        assert_eq!(listed[0].subject.as_deref(), Some("Dentist (moved)"));

        provider.remove_appointment(&edited).await.unwrap();
        assert_eq!(provider.appointment_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_insert_rejected() {
        let provider = provider();
        let home = provider.list_calendars().await.unwrap().remove(0);
        let appt = appointment("a1", &home);
        provider.insert_appointment(&appt).await.unwrap();

        let err = provider.insert_appointment(&appt).await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn read_only_calendar_rejects_writes() {
        let provider = provider();
        let holidays = provider.list_calendars().await.unwrap().remove(1);

        let err = provider
            .insert_appointment(&appointment("h1", &holidays))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ReadOnly);
        assert_eq!(err.provider(), Some("local"));
    }

    #[tokio::test]
    async fn unknown_targets_are_not_found() {
        let provider = provider();
        let ghost = Calendar::new("local", "ghost", "Ghost").with_access(AccessRights::Write);

        assert_eq!(
            provider.list_appointments(&ghost).await.unwrap_err().code(),
            ProviderErrorCode::NotFound
        );

        let home = provider.list_calendars().await.unwrap().remove(0);
        let err = provider
            .remove_appointment(&appointment("missing", &home))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::NotFound);
    }

    #[tokio::test]
    async fn list_all_spans_calendars() {
        let provider = provider();
        let home = provider.list_calendars().await.unwrap().remove(0);
        provider
            .insert_appointment(&appointment("a1", &home))
            .await
            .unwrap();
        provider
            .insert_appointment(&appointment("a2", &home))
            .await
            .unwrap();

        let all = provider.list_all_appointments().await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
