//! Aggregation and sync: catalog, appointment store, scheduler, hub.
//!
//! This crate merges the calendars and appointments of every registered
//! provider into one view:
//! - [`Catalog`] fans reads out across providers and routes mutations
//! - [`AppointmentStore`] owns the merged set and publishes snapshots
//! - [`SyncScheduler`] refreshes the store periodically and on demand
//! - [`CalendarHub`] applies consumer edits and forwards them to backends
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use calhub_providers::{LocalProvider, ProviderRegistry};
//! use calhub_server::{AppointmentStore, Catalog, SyncConfig, SyncScheduler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ProviderRegistry::builder()
//!         .register_instance(Arc::new(LocalProvider::default()))
//!         .build()?;
//!     let catalog = Arc::new(Catalog::new(registry));
//!     let store = Arc::new(AppointmentStore::new());
//!
//!     let (handle, _task) = SyncScheduler::new(SyncConfig::default(), catalog, store).spawn();
//!     let mut snapshots = handle.subscribe();
//!     snapshots.changed().await?;
//!     println!("{} appointments", snapshots.borrow().len());
//!     Ok(())
//! }
//! ```

mod catalog;
mod error;
mod hub;
mod merged;
mod scheduler;
mod store;

pub use catalog::{Catalog, MutationKind};
pub use error::{CatalogError, CatalogResult, HubError, HubResult, SchedulerError, SyncError};
pub use hub::CalendarHub;
pub use merged::MergedAppointments;
pub use scheduler::{
    SyncConfig, SyncHandle, SyncPhase, SyncReport, SyncScheduler, SyncStatus, sync_once,
};
pub use store::{AppointmentStore, Snapshot, SyncTicket};
