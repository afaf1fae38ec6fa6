//! Server error types.

use thiserror::Error;

use calhub_core::AppointmentId;
use calhub_providers::ProviderError;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Errors raised by the catalog.
///
/// Provider failures are normally absorbed (empty result or `false`); only
/// routing problems and the strict fetch surface as errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A mutation named a provider that is not registered.
    #[error("provider not found: {name}")]
    ProviderNotFound { name: String },

    /// The registry is empty.
    #[error("no calendar provider available")]
    NoProviderAvailable,

    /// A backend failed during a strict fetch.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] ProviderError),
}

impl CatalogError {
    /// Returns true if retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::BackendUnavailable(e) => e.is_retryable(),
            Self::ProviderNotFound { .. } | Self::NoProviderAvailable => false,
        }
    }
}

/// Why a sync cycle produced no snapshot.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync cycle faulted: {0}")]
    Faulted(#[from] CatalogError),

    #[error("sync cycle cancelled")]
    Cancelled,

    /// The cycle task ended without a result, usually a panic.
    #[error("sync cycle task failed: {0}")]
    TaskFailed(String),
}

/// Errors raised by [`CalendarHub`](crate::CalendarHub) mutations.
#[derive(Debug, Error)]
pub enum HubError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The appointment is not in the merged set.
    #[error("unknown appointment: {0}")]
    UnknownAppointment(AppointmentId),

    /// No calendar could be chosen for a new appointment.
    #[error("no writable calendar available")]
    NoWritableCalendar,

    /// The owning backend refused or failed the change. Local state was
    /// rolled back.
    #[error("backend rejected change to appointment {0}")]
    Rejected(AppointmentId),
}

/// Errors raised by [`SyncHandle`](crate::SyncHandle).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("sync scheduler has stopped")]
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(!CatalogError::NoProviderAvailable.is_retryable());
        assert!(
            !CatalogError::ProviderNotFound {
                name: "Work".into()
            }
            .is_retryable()
        );
        assert!(CatalogError::BackendUnavailable(ProviderError::network("down")).is_retryable());
        assert!(
            !CatalogError::BackendUnavailable(ProviderError::authentication("expired"))
                .is_retryable()
        );
    }

    #[test]
    fn display() {
        let err = CatalogError::ProviderNotFound {
            name: "Archive".into(),
        };
        assert_eq!(err.to_string(), "provider not found: Archive");

        let err = HubError::from(CatalogError::NoProviderAvailable);
        assert_eq!(err.to_string(), "no calendar provider available");

        let err = SyncError::from(CatalogError::NoProviderAvailable);
        assert!(err.to_string().starts_with("sync cycle faulted"));
    }
}
