//! Scripted providers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, TimeZone, Utc};
use tokio::sync::Notify;

use calhub_core::{AccessRights, Appointment, AppointmentId, Calendar};
use calhub_providers::{
    BoxFuture, CalendarProvider, ProviderError, ProviderRegistry, ProviderResult,
};

/// A provider with one writable calendar whose backend contents and
/// failures are driven by the test.
pub struct Scripted {
    name: String,
    calendar: Calendar,
    backend: Mutex<Vec<Appointment>>,
    writes: Mutex<Vec<(&'static str, String)>>,
    fail_discovery: AtomicBool,
    hold_fetch: AtomicBool,
    hold_remove: AtomicBool,
    hex_ids_only: AtomicBool,
    pub fetch_started: Notify,
    pub release_fetch: Notify,
    pub remove_started: Notify,
    pub release_remove: Notify,
}

impl Scripted {
    pub fn new(name: &str, calendar_id: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calendar: Calendar::new(name, calendar_id, name).with_access(AccessRights::Write),
            backend: Mutex::new(Vec::new()),
            writes: Mutex::new(Vec::new()),
            fail_discovery: AtomicBool::new(false),
            hold_fetch: AtomicBool::new(false),
            hold_remove: AtomicBool::new(false),
            hex_ids_only: AtomicBool::new(false),
            fetch_started: Notify::new(),
            release_fetch: Notify::new(),
            remove_started: Notify::new(),
            release_remove: Notify::new(),
        })
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar.clone()
    }

    /// Puts an appointment into the backend, bypassing the catalog.
    pub fn seed(&self, id: &str) {
        let appointment = appointment(id).with_calendar(self.calendar.clone());
        self.backend.lock().unwrap().push(appointment);
    }

    pub fn backend_ids(&self) -> Vec<String> {
        self.backend
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.id.to_string())
            .collect()
    }

    /// Writes received so far, as `(kind, id)`.
    pub fn writes(&self) -> Vec<(&'static str, String)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn set_fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    /// Makes the next fetches wait for `release_fetch` after reading the
    /// backend.
    pub fn set_hold_fetch(&self, hold: bool) {
        self.hold_fetch.store(hold, Ordering::SeqCst);
    }

    /// Makes the next removes wait for `release_remove` before touching
    /// the backend.
    pub fn set_hold_remove(&self, hold: bool) {
        self.hold_remove.store(hold, Ordering::SeqCst);
    }

    /// Makes the backend refuse to keep ids that are not lowercase hex.
    pub fn set_hex_ids_only(&self, strict: bool) {
        self.hex_ids_only.store(strict, Ordering::SeqCst);
    }

    fn record(&self, kind: &'static str, appointment: &Appointment) {
        self.writes
            .lock()
            .unwrap()
            .push((kind, appointment.id.to_string()));
    }
}

impl CalendarProvider for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_id(&self, id: &AppointmentId) -> bool {
        !self.hex_ids_only.load(Ordering::SeqCst)
            || (id.as_str().len() >= 5
                && id
                    .as_str()
                    .bytes()
                    .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)))
    }

    fn list_calendars(&self) -> BoxFuture<'_, ProviderResult<Vec<Calendar>>> {
        let result = if self.fail_discovery.load(Ordering::SeqCst) {
            Err(ProviderError::network("unreachable").with_provider(&self.name))
        } else {
            Ok(vec![self.calendar.clone()])
        };
        Box::pin(async move { result })
    }

    fn list_appointments<'a>(
        &'a self,
        _calendar: &'a Calendar,
    ) -> BoxFuture<'a, ProviderResult<Vec<Appointment>>> {
        let items = self.backend.lock().unwrap().clone();
        let hold = self.hold_fetch.load(Ordering::SeqCst);
        Box::pin(async move {
            if hold {
                self.fetch_started.notify_one();
                self.release_fetch.notified().await;
            }
            Ok(items)
        })
    }

    fn insert_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        self.record("insert", appointment);
        self.backend.lock().unwrap().push(appointment.clone());
        Box::pin(async { Ok(()) })
    }

    fn update_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        self.record("update", appointment);
        let mut backend = self.backend.lock().unwrap();
        let result = match backend.iter_mut().find(|a| a.id == appointment.id) {
            Some(existing) => {
                *existing = appointment.clone();
                Ok(())
            }
            None => Err(ProviderError::not_found("no such event")),
        };
        Box::pin(async move { result })
    }

    fn remove_appointment<'a>(
        &'a self,
        appointment: &'a Appointment,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        self.record("remove", appointment);
        let hold = self.hold_remove.load(Ordering::SeqCst);
        Box::pin(async move {
            if hold {
                self.remove_started.notify_one();
                self.release_remove.notified().await;
            }
            let mut backend = self.backend.lock().unwrap();
            let before = backend.len();
            backend.retain(|a| a.id != appointment.id);
            if backend.len() < before {
                Ok(())
            } else {
                Err(ProviderError::not_found("no such event"))
            }
        })
    }
}

pub fn appointment(id: &str) -> Appointment {
    let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
    Appointment::new(id, start, start + Duration::hours(1)).with_subject(format!("Meeting {id}"))
}

pub fn registry(providers: &[Arc<Scripted>]) -> ProviderRegistry {
    providers
        .iter()
        .fold(ProviderRegistry::builder(), |builder, p| {
            builder.register_instance(p.clone())
        })
        .build()
        .unwrap()
}
