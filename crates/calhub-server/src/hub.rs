//! Consumer-facing mutation path.
//!
//! [`CalendarHub`] applies creates, updates and removes to the store first,
//! publishes right away, and then forwards the change to the owning
//! provider through the [`Catalog`]. If the provider does not accept the
//! change, the store is rolled back and published again.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use calhub_core::{Appointment, AppointmentId, Calendar};

use crate::catalog::{Catalog, MutationKind};
use crate::error::{HubError, HubResult};
use crate::store::AppointmentStore;

/// Creates, updates and removes appointments on behalf of consumers.
#[derive(Debug, Clone)]
pub struct CalendarHub {
    catalog: Arc<Catalog>,
    store: Arc<AppointmentStore>,
}

impl CalendarHub {
    pub fn new(catalog: Arc<Catalog>, store: Arc<AppointmentStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<AppointmentStore> {
        &self.store
    }

    /// The calendar new appointments go to: the catalog default, else the
    /// first writable calendar discovered.
    pub async fn default_calendar(&self) -> Option<Calendar> {
        if let Some(calendar) = self.catalog.default_calendar() {
            return Some(calendar);
        }
        let mut calendars = std::pin::pin!(self.catalog.calendars_stream());
        while let Some(calendar) = calendars.next().await {
            if calendar.is_writable() {
                return Some(calendar);
            }
        }
        None
    }

    /// Creates an appointment and returns it as stored.
    ///
    /// An appointment without calendar goes to the default calendar. A
    /// missing or already used id, or one the owning backend would replace,
    /// is swapped for a generated one.
    pub async fn create(&self, mut appointment: Appointment) -> HubResult<Appointment> {
        if appointment.calendar.is_none() {
            let calendar = self
                .default_calendar()
                .await
                .ok_or(HubError::NoWritableCalendar)?;
            appointment.calendar = Some(calendar);
        }

        let provider = self.catalog.resolve_provider(&appointment)?;
        if !provider.accepts_id(&appointment.id) {
            debug!(
                provider = provider.name(),
                id = %appointment.id,
                "backend would not keep this id"
            );
            appointment.id = AppointmentId::generate();
        }

        let written = self.store.insert_new(appointment);
        self.store.publish();

        match self.catalog.mutate(&written, MutationKind::Insert).await {
            Ok(true) => {
                info!(id = %written.id, "appointment created");
                Ok(written)
            }
            outcome => {
                self.undo(&written, None);
                Err(rollback_error(outcome, written.id))
            }
        }
    }

    /// Replaces a known appointment.
    ///
    /// An appointment without calendar keeps the calendar it had.
    pub async fn update(&self, appointment: Appointment) -> HubResult<()> {
        let id = appointment.id.clone();
        let (previous, written) = self
            .store
            .replace_if_present(&id, move |current| {
                let mut edited = appointment;
                if edited.calendar.is_none() {
                    edited.calendar = current.calendar.clone();
                }
                edited
            })
            .ok_or_else(|| HubError::UnknownAppointment(id))?;
        self.commit_update(previous, written).await
    }

    /// Removes a known appointment from the store and its backend.
    pub async fn remove(&self, id: &AppointmentId) -> HubResult<()> {
        let removed = self
            .store
            .remove(id)
            .ok_or_else(|| HubError::UnknownAppointment(id.clone()))?;
        self.store.publish();

        match self.catalog.mutate(&removed, MutationKind::Remove).await {
            Ok(true) => {
                self.store.confirm_removed(id);
                info!(%id, "appointment removed");
                Ok(())
            }
            outcome => {
                if self.store.restore(removed) {
                    self.store.publish();
                }
                Err(rollback_error(outcome, id.clone()))
            }
        }
    }

    /// Applies an edit made in a view.
    ///
    /// Views do not carry reminders or calendars, so both are taken from
    /// the known appointment before updating.
    pub async fn apply_view_change(&self, edited: Appointment) -> HubResult<()> {
        let id = edited.id.clone();
        let (previous, written) = self
            .store
            .replace_if_present(&id, move |known| Appointment {
                reminder: known.reminder.clone(),
                calendar: known.calendar.clone(),
                ..edited
            })
            .ok_or_else(|| HubError::UnknownAppointment(id))?;
        self.commit_update(previous, written).await
    }

    async fn commit_update(&self, previous: Appointment, written: Appointment) -> HubResult<()> {
        self.store.publish();

        match self.catalog.mutate(&written, MutationKind::Update).await {
            Ok(true) => {
                debug!(id = %written.id, "appointment updated");
                Ok(())
            }
            outcome => {
                self.undo(&written, Some(previous));
                Err(rollback_error(outcome, written.id))
            }
        }
    }

    fn undo(&self, written: &Appointment, previous: Option<Appointment>) {
        if self.store.revert(written, previous) {
            self.store.publish();
        } else {
            debug!(id = %written.id, "entry changed meanwhile, keeping it");
        }
    }
}

fn rollback_error(
    outcome: Result<bool, crate::error::CatalogError>,
    id: AppointmentId,
) -> HubError {
    match outcome {
        Err(e) => {
            warn!(%id, error = %e, "mutation not routed, rolled back");
            HubError::Catalog(e)
        }
        Ok(_) => {
            warn!(%id, "backend rejected mutation, rolled back");
            HubError::Rejected(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calhub_core::{AccessRights, ReminderInfo};
    use calhub_providers::{CalendarProvider, LocalProvider, ProviderRegistry};
    use chrono::{Duration, TimeZone, Utc};

    fn appointment(id: &str) -> Appointment {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        Appointment::new(id, start, start + Duration::hours(1)).with_subject("Sync")
    }

    fn hub_with(provider: Arc<LocalProvider>) -> CalendarHub {
        let registry = ProviderRegistry::builder()
            .register_instance(provider)
            .build()
            .unwrap();
        CalendarHub::new(
            Arc::new(Catalog::new(registry)),
            Arc::new(AppointmentStore::new()),
        )
    }

    fn local() -> Arc<LocalProvider> {
        Arc::new(
            LocalProvider::new("local")
                .with_calendar("holidays", "Holidays", AccessRights::Read)
                .with_calendar("home", "Home", AccessRights::Write),
        )
    }

    #[tokio::test]
    async fn default_calendar_is_first_writable() {
        let hub = hub_with(local());
        let calendar = hub.default_calendar().await.unwrap();
        assert_eq!(calendar.calendar_id, "home");
    }

    #[tokio::test]
    async fn catalog_default_wins() {
        let provider = local();
        let hub = hub_with(provider.clone());
        let holidays = provider.list_calendars().await.unwrap().remove(0);
        hub.catalog().set_default_calendar(holidays);
        assert_eq!(hub.default_calendar().await.unwrap().calendar_id, "holidays");
    }

    #[tokio::test]
    async fn create_publishes_and_persists() {
        let provider = local();
        let hub = hub_with(provider.clone());
        let mut snapshots = hub.store().subscribe();

        let created = hub.create(appointment("a1")).await.unwrap();
        assert_eq!(created.id.as_str(), "a1");
        assert_eq!(created.calendar.as_ref().unwrap().calendar_id, "home");
        assert_eq!(provider.appointment_count(), 1);

        assert!(snapshots.has_changed().unwrap());
        assert!(snapshots.borrow_and_update().contains(&created.id));
    }

    #[tokio::test]
    async fn create_replaces_empty_and_colliding_ids() {
        let hub = hub_with(local());

        let first = hub.create(appointment("dup")).await.unwrap();
        let second = hub.create(appointment("dup")).await.unwrap();
        assert_ne!(first.id, second.id);

        let anonymous = hub.create(appointment("")).await.unwrap();
        assert!(!anonymous.id.is_empty());
        assert_eq!(hub.store().len(), 3);
    }

    #[tokio::test]
    async fn concurrent_creates_with_same_id_are_both_kept() {
        let provider = local();
        let hub = hub_with(provider.clone());

        let (first, second) = tokio::join!(
            hub.create(appointment("dup")),
            hub.create(appointment("dup").with_subject("Other"))
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first.id, second.id);
        assert_eq!(hub.store().len(), 2);
        assert_eq!(provider.appointment_count(), 2);
        assert_eq!(
            hub.store().get(&second.id).unwrap().subject.as_deref(),
            Some("Other")
        );
    }

    #[tokio::test]
    async fn rejected_create_is_rolled_back() {
        let provider = local();
        let hub = hub_with(provider.clone());
        let holidays = provider.list_calendars().await.unwrap().remove(0);

        let err = hub
            .create(appointment("h1").with_calendar(holidays))
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::Rejected(ref id) if id.as_str() == "h1"));
        assert!(hub.store().is_empty());
        assert!(hub.store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn no_writable_calendar() {
        let provider =
            Arc::new(LocalProvider::new("local").with_calendar("ro", "RO", AccessRights::Read));
        let hub = hub_with(provider);
        assert!(matches!(
            hub.create(appointment("x")).await,
            Err(HubError::NoWritableCalendar)
        ));
    }

    #[tokio::test]
    async fn update_and_remove() {
        let provider = local();
        let hub = hub_with(provider.clone());
        let created = hub.create(appointment("a1")).await.unwrap();

        let mut edited = created.clone().with_subject("Moved");
        edited.calendar = None;
        hub.update(edited).await.unwrap();
        let stored = hub.store().get(&created.id).unwrap();
        assert_eq!(stored.subject.as_deref(), Some("Moved"));
        assert!(stored.calendar.is_some());

        hub.remove(&created.id).await.unwrap();
        assert!(!hub.store().contains(&created.id));
        assert_eq!(provider.appointment_count(), 0);
    }

    #[tokio::test]
    async fn unknown_appointments() {
        let hub = hub_with(local());
        let id = AppointmentId::from("nope");
        assert!(matches!(
            hub.remove(&id).await,
            Err(HubError::UnknownAppointment(_))
        ));
        assert!(matches!(
            hub.update(appointment("nope")).await,
            Err(HubError::UnknownAppointment(_))
        ));
    }

    #[tokio::test]
    async fn failed_remove_is_restored() {
        let provider = local();
        let hub = hub_with(provider.clone());
        let home = provider.list_calendars().await.unwrap().remove(1);

        // known locally, absent from the backend
        hub.store()
            .upsert(appointment("orphan").with_calendar(home));
        let id = AppointmentId::from("orphan");

        assert!(matches!(hub.remove(&id).await, Err(HubError::Rejected(_))));
        assert!(hub.store().contains(&id));
        assert!(hub.store().snapshot().contains(&id));
    }

    #[tokio::test]
    async fn view_change_keeps_reminder_and_calendar() {
        let hub = hub_with(local());
        let created = hub
            .create(appointment("a1").with_reminder(ReminderInfo::new("15m")))
            .await
            .unwrap();

        let mut from_view = appointment("a1").with_subject("Renamed");
        from_view.id = created.id.clone();
        hub.apply_view_change(from_view).await.unwrap();

        let stored = hub.store().get(&created.id).unwrap();
        assert_eq!(stored.subject.as_deref(), Some("Renamed"));
        assert_eq!(stored.reminder, Some(ReminderInfo::new("15m")));
        assert_eq!(stored.calendar, created.calendar);
    }
}
