//! The calendar catalog.
//!
//! [`Catalog`] fans reads out across every registered provider and routes
//! mutations to the provider that owns the appointment's calendar.
//! Provider failures are absorbed: a backend that is down contributes no
//! calendars or appointments and its mutations report `false`.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use calhub_core::{Appointment, Calendar};
use calhub_providers::{CalendarProvider, ProviderRegistry};

use crate::error::{CatalogError, CatalogResult};

/// The kind of change a mutation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Remove,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Remove => "remove",
        })
    }
}

/// Aggregation façade over the provider registry.
#[derive(Debug, Default)]
pub struct Catalog {
    registry: ProviderRegistry,
    default_calendar: RwLock<Option<Calendar>>,
}

impl Catalog {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            default_calendar: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Every provider, in registration order.
    pub fn providers(&self) -> &[Arc<dyn CalendarProvider>] {
        self.registry.all_providers()
    }

    /// Sets the calendar that receives appointments without one.
    pub fn set_default_calendar(&self, calendar: Calendar) {
        debug!(calendar = %calendar.key(), "default calendar set");
        *self
            .default_calendar
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(calendar);
    }

    pub fn clear_default_calendar(&self) {
        *self
            .default_calendar
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn default_calendar(&self) -> Option<Calendar> {
        self.default_calendar
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calendars of every provider, provider by provider in registration
    /// order. Providers are queried lazily as the stream is polled.
    pub fn calendars_stream(&self) -> impl Stream<Item = Calendar> + Send + '_ {
        stream::iter(self.providers())
            .then(|provider| async move {
                match provider.list_calendars().await {
                    Ok(calendars) => calendars,
                    Err(e) => {
                        warn!(provider = provider.name(), error = %e, "calendar discovery failed");
                        Vec::new()
                    }
                }
            })
            .flat_map(stream::iter)
    }

    /// Collects [`calendars_stream`](Self::calendars_stream).
    pub async fn calendars(&self) -> Vec<Calendar> {
        self.calendars_stream().collect().await
    }

    /// Appointments of every provider. Failing providers contribute nothing.
    pub async fn appointments(&self) -> Vec<Appointment> {
        let mut appointments = Vec::new();
        for provider in self.providers() {
            match provider.list_all_appointments().await {
                Ok(found) => appointments.extend(found),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "appointment fetch failed");
                }
            }
        }
        appointments
    }

    /// Appointments of every provider, failing on the first provider error.
    pub async fn try_appointments(&self) -> CatalogResult<Vec<Appointment>> {
        let mut appointments = Vec::new();
        for provider in self.providers() {
            let found = provider
                .list_all_appointments()
                .await
                .map_err(CatalogError::BackendUnavailable)?;
            debug!(provider = provider.name(), count = found.len(), "fetched appointments");
            appointments.extend(found);
        }
        Ok(appointments)
    }

    /// Appointments of one calendar, asked of the provider that owns it.
    pub async fn calendar_appointments(&self, calendar: &Calendar) -> Vec<Appointment> {
        let Some(provider) = self.registry.lookup(&calendar.provider_name) else {
            warn!(provider = %calendar.provider_name, "calendar of unknown provider");
            return Vec::new();
        };
        provider
            .list_appointments(calendar)
            .await
            .unwrap_or_else(|e| {
                warn!(calendar = %calendar.key(), error = %e, "appointment fetch failed");
                Vec::new()
            })
    }

    /// Picks the provider a mutation of `appointment` goes to: the owner of
    /// its calendar, else the owner of the default calendar, else the first
    /// registered provider.
    pub fn resolve_provider(
        &self,
        appointment: &Appointment,
    ) -> CatalogResult<&Arc<dyn CalendarProvider>> {
        if self.registry.is_empty() {
            return Err(CatalogError::NoProviderAvailable);
        }

        let name = match (&appointment.calendar, self.default_calendar()) {
            (Some(calendar), _) => calendar.provider_name.clone(),
            (None, Some(default)) => default.provider_name,
            (None, None) => {
                return self
                    .registry
                    .first()
                    .ok_or(CatalogError::NoProviderAvailable);
            }
        };

        self.registry
            .lookup(&name)
            .ok_or(CatalogError::ProviderNotFound { name })
    }

    /// Applies a mutation through the owning provider.
    ///
    /// An appointment without a calendar is given the default calendar
    /// first. Returns `Ok(false)` when the provider reports a failure.
    pub async fn mutate(&self, appointment: &Appointment, kind: MutationKind) -> CatalogResult<bool> {
        let mut target = Cow::Borrowed(appointment);
        if target.calendar.is_none()
            && let Some(default) = self.default_calendar()
        {
            target.to_mut().calendar = Some(default);
        }

        let provider = self.resolve_provider(&target)?;
        debug!(
            provider = provider.name(),
            id = %target.id,
            %kind,
            "routing mutation"
        );

        let result = match kind {
            MutationKind::Insert => provider.insert_appointment(&target).await,
            MutationKind::Update => provider.update_appointment(&target).await,
            MutationKind::Remove => provider.remove_appointment(&target).await,
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    id = %target.id,
                    %kind,
                    error = %e,
                    "mutation failed"
                );
                Ok(false)
            }
        }
    }
}
