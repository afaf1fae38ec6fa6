//! The merged appointment set.
//!
//! Appointments from every provider, keyed by id. Sync merges only add ids
//! that are not present yet; local edits replace entries in place.

use std::collections::HashMap;

use calhub_core::{Appointment, AppointmentId};
use tracing::trace;

/// Appointments from all providers, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct MergedAppointments {
    entries: HashMap<AppointmentId, Appointment>,
}

impl MergedAppointments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the appointment unless its id is already known.
    ///
    /// Returns true if it was added.
    pub fn insert_if_absent(&mut self, appointment: Appointment) -> bool {
        if self.entries.contains_key(&appointment.id) {
            trace!(id = %appointment.id, "already merged");
            return false;
        }
        self.entries.insert(appointment.id.clone(), appointment);
        true
    }

    /// Inserts or replaces the appointment, returning the previous entry.
    pub fn upsert(&mut self, appointment: Appointment) -> Option<Appointment> {
        self.entries.insert(appointment.id.clone(), appointment)
    }

    pub fn remove(&mut self, id: &AppointmentId) -> Option<Appointment> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &AppointmentId) -> Option<&Appointment> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &AppointmentId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Appointment> {
        self.entries.values()
    }

    /// Clones every entry, ordered by start time and then id.
    pub fn to_sorted_vec(&self) -> Vec<Appointment> {
        let mut appointments: Vec<_> = self.entries.values().cloned().collect();
        appointments.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        appointments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn appointment(id: &str, hour: u32) -> Appointment {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, hour, 0, 0).unwrap();
        Appointment::new(id, start, start + Duration::hours(1))
    }

    #[test]
    fn insert_if_absent_is_idempotent() {
        let mut merged = MergedAppointments::new();
        assert!(merged.insert_if_absent(appointment("1", 9)));
        assert!(!merged.insert_if_absent(appointment("1", 9)));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn insert_if_absent_keeps_existing_entry() {
        let mut merged = MergedAppointments::new();
        merged.insert_if_absent(appointment("1", 9).with_subject("local edit"));
        merged.insert_if_absent(appointment("1", 9).with_subject("from backend"));

        let kept = merged.get(&AppointmentId::from("1")).unwrap();
        assert_eq!(kept.subject.as_deref(), Some("local edit"));
    }

    #[test]
    fn upsert_replaces() {
        let mut merged = MergedAppointments::new();
        assert!(merged.upsert(appointment("1", 9)).is_none());
        let previous = merged.upsert(appointment("1", 11)).unwrap();
        assert_eq!(previous.start.format("%H").to_string(), "09");
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn sorted_by_start_then_id() {
        let mut merged = MergedAppointments::new();
        merged.upsert(appointment("b", 10));
        merged.upsert(appointment("c", 8));
        merged.upsert(appointment("a", 10));

        let ids: Vec<_> = merged
            .to_sorted_vec()
            .into_iter()
            .map(|a| a.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn remove() {
        let mut merged = MergedAppointments::new();
        merged.upsert(appointment("1", 9));
        assert!(merged.remove(&AppointmentId::from("1")).is_some());
        assert!(merged.remove(&AppointmentId::from("1")).is_none());
        assert!(merged.is_empty());
    }
}
