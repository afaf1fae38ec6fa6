//! Command implementations.
//!
//! Every command except `config` opens a [`Session`]: the providers from the
//! configuration behind a catalog, an appointment store and a hub.

pub mod appointments;
pub mod calendars;
pub mod config;
pub mod mutate;
pub mod watch;

use std::sync::Arc;

use tracing::debug;

use calhub_core::{Calendar, CalendarKey};
use calhub_server::{AppointmentStore, CalendarHub, Catalog, Snapshot, sync_once};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Providers, store and hub built from one configuration.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<Catalog>,
    store: Arc<AppointmentStore>,
    hub: CalendarHub,
    tolerate_partial_fetch: bool,
}

impl Session {
    /// Builds the providers and resolves the configured default calendar.
    pub async fn open(config: &ClientConfig) -> ClientResult<Self> {
        let catalog = Arc::new(Catalog::new(config.build_registry()?));
        let store = Arc::new(AppointmentStore::new());
        let hub = CalendarHub::new(catalog.clone(), store.clone());
        let session = Self {
            catalog,
            store,
            hub,
            tolerate_partial_fetch: config.sync.tolerate_partial_fetch,
        };

        if let Some(key) = config.default_calendar_key()? {
            let calendar = session.find_calendar(&key).await?;
            session.catalog.set_default_calendar(calendar);
        }
        Ok(session)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<AppointmentStore> {
        &self.store
    }

    pub fn hub(&self) -> &CalendarHub {
        &self.hub
    }

    /// Fetches every provider once and publishes the result.
    pub async fn load(&self) -> ClientResult<Snapshot> {
        let report = sync_once(&self.catalog, &self.store, self.tolerate_partial_fetch).await?;
        debug!(added = report.added, "initial load");
        Ok(report.snapshot)
    }

    /// Finds a discovered calendar by key.
    pub async fn find_calendar(&self, key: &CalendarKey) -> ClientResult<Calendar> {
        self.catalog
            .calendars()
            .await
            .into_iter()
            .find(|c| &c.key() == key)
            .ok_or_else(|| ClientError::CalendarNotFound(key.to_string()))
    }

    /// Parses `provider/calendar_id` and finds the calendar.
    pub async fn find_calendar_str(&self, key: &str) -> ClientResult<Calendar> {
        let key = key
            .parse::<CalendarKey>()
            .map_err(ClientError::InvalidArgument)?;
        self.find_calendar(&key).await
    }
}

/// Prints `value` as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> ClientResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
