//! CalendarProvider trait definition.
//!
//! A provider represents one calendar backend: calendar discovery plus
//! appointment CRUD for that backend's calendars. Implementations are
//! constructed independently and fail independently. Every operation
//! reports failure through [`ProviderResult`], so a single unreachable
//! backend never aborts a fan-out across providers.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, warn};

use calhub_core::{Appointment, AppointmentId, Calendar};

use crate::error::{ProviderError, ProviderResult};

/// A boxed future for async trait methods.
///
/// Keeps the trait object-safe so providers can live behind
/// `Arc<dyn CalendarProvider>` in the registry.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core abstraction for calendar backends.
///
/// # Implementation Notes
///
/// - `name()` must be stable: it is the registry key and is stamped into
///   every [`Calendar::provider_name`] the provider returns.
/// - Appointments returned by `list_appointments` carry their owning calendar.
/// - Transport and API failures are reported as `Err`, never by panicking.
///
/// # Example Implementation
///
/// ```ignore
/// impl CalendarProvider for MyProvider {
///     fn name(&self) -> &str { "mine" }
///
///     fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
///         Box::pin(async move { self.client.calendars().await })
///     }
///     // ... other methods
/// }
/// ```
pub trait CalendarProvider: Send + Sync {
    /// Returns the stable name of this provider (e.g. `"google:work"`).
    fn name(&self) -> &str;

    /// Discovers all calendars visible to the backend identity.
    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>>;

    /// Lists the appointments of one calendar.
    fn list_appointments<'a>(
        &'a self,
        calendar: &'a Calendar,
    ) -> BoxFuture<'a, ProviderResult<Vec<Appointment>>>;

    /// Lists the appointments of every calendar of this provider.
    ///
    /// Errors that mean the backend is unavailable abort the listing. Errors
    /// scoped to one calendar (not found, forbidden) skip that calendar.
    fn list_all_appointments(&self) -> BoxFuture<'_, ProviderResult<Vec<Appointment>>> {
        Box::pin(async move {
            let calendars = self.list_calendars().await?;
            let mut appointments = Vec::new();

            for calendar in &calendars {
                match self.list_appointments(calendar).await {
                    Ok(found) => {
                        debug!(
                            provider = self.name(),
                            calendar = %calendar.calendar_id,
                            count = found.len(),
                            "listed appointments"
                        );
                        appointments.extend(found);
                    }
                    Err(e) if e.is_unavailable() => return Err(e),
                    Err(e) => {
                        warn!(
                            provider = self.name(),
                            calendar = %calendar.calendar_id,
                            error = %e,
                            "skipping calendar"
                        );
                    }
                }
            }

            Ok(appointments)
        })
    }

    /// Creates the appointment in the calendar it is assigned to.
    fn insert_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Overwrites the mutable fields of an existing appointment.
    fn update_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Deletes the appointment by id.
    fn remove_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// How often this backend should be polled at most.
    fn suggested_poll_interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// Whether the backend stores a new appointment under the id it was
    /// created with. Ids it would replace must not be handed to
    /// `insert_appointment`.
    fn accepts_id(&self, _id: &AppointmentId) -> bool {
        true
    }
}

/// Returns the calendar an appointment must be written to, or an error
/// suitable for returning from a write operation.
pub fn target_calendar<'a>(
    provider: &str,
    appointment: &'a Appointment,
) -> ProviderResult<&'a Calendar> {
    let calendar = appointment.calendar.as_ref().ok_or_else(|| {
        ProviderError::bad_request(format!("appointment {} has no calendar", appointment.id))
            .with_provider(provider)
    })?;
    if calendar.provider_name != provider {
        return Err(ProviderError::bad_request(format!(
            "calendar {} belongs to provider {}",
            calendar.calendar_id, calendar.provider_name
        ))
        .with_provider(provider));
    }
    Ok(calendar)
}

/// A provider that fails every call with the same error.
///
/// Stands in for a backend that could not be set up, so that it still shows
/// up by name in the registry.
#[derive(Debug)]
pub struct UnavailableProvider {
    name: String,
    error: ProviderError,
}

impl UnavailableProvider {
    pub fn new(name: impl Into<String>, error: ProviderError) -> Self {
        Self {
            name: name.into(),
            error,
        }
    }

    fn fail<T: Send + 'static>(&self) -> BoxFuture<'_, ProviderResult<T>> {
        let error = self.error.detached(&self.name);
        Box::pin(async move { Err(error) })
    }
}

impl CalendarProvider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
        self.fail()
    }

    fn list_appointments<'a>(
        &'a self,
        _calendar: &'a Calendar,
    ) -> BoxFuture<'a, ProviderResult<Vec<Appointment>>> {
        self.fail()
    }

    fn insert_appointment<'a>(
        &'a self,
        _appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        self.fail()
    }

    fn update_appointment<'a>(
        &'a self,
        _appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        self.fail()
    }

    fn remove_appointment<'a>(
        &'a self,
        _appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        self.fail()
    }
}
