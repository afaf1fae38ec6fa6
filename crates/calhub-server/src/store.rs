//! The appointment store.
//!
//! [`AppointmentStore`] is the single owner of the merged appointment set
//! and of the snapshot channel. Every change goes through it: sync merges
//! as well as local creates, updates and removes.
//!
//! # Removes racing a sync
//!
//! A sync cycle fetches from the backends and merges afterwards, so a fetch
//! that started before a remove can still contain the removed appointment.
//! The store keeps a mutation sequence that grows with every remove:
//!
//! - [`begin_sync`](AppointmentStore::begin_sync) records the current
//!   sequence in a [`SyncTicket`].
//! - [`remove`](AppointmentStore::remove) leaves a pending tombstone. No
//!   merge adds the id back and no merge prunes it while the backend delete
//!   is in flight.
//! - [`confirm_removed`](AppointmentStore::confirm_removed) stamps the
//!   tombstone with a new sequence number once the backend acknowledged
//!   the delete.
//! - [`merge_fetched`](AppointmentStore::merge_fetched) skips ids whose
//!   tombstone is newer than the ticket, then drops tombstones the ticket
//!   has caught up with.
//!
//! A remove therefore wins over any fetch that started before it completed,
//! and any fetch that started afterwards decides.
//!
//! Hub bookkeeping reads and writes under one lock acquisition:
//! [`insert_new`](AppointmentStore::insert_new),
//! [`replace_if_present`](AppointmentStore::replace_if_present) and
//! [`revert`](AppointmentStore::revert).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, trace};

use calhub_core::{Appointment, AppointmentId};

use crate::merged::MergedAppointments;

/// An immutable view of the merged set, as published to consumers.
#[derive(Debug, Clone)]
pub struct Snapshot {
    appointments: Arc<[Appointment]>,
    version: u64,
    published_at: DateTime<Utc>,
}

impl Snapshot {
    /// The snapshot a store starts with: no appointments, version 0.
    pub fn empty() -> Self {
        Self {
            appointments: Arc::from(Vec::new()),
            version: 0,
            published_at: Utc::now(),
        }
    }

    /// Appointments ordered by start time, then id.
    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// Increases by one with every publish.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn get(&self, id: &AppointmentId) -> Option<&Appointment> {
        self.appointments.iter().find(|a| &a.id == id)
    }

    pub fn contains(&self, id: &AppointmentId) -> bool {
        self.get(id).is_some()
    }
}

/// Tombstone stamp of a remove the backend has not acknowledged yet.
const PENDING: u64 = u64::MAX;

/// Position in the mutation sequence at which a sync fetch started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SyncTicket(u64);

#[derive(Debug, Default)]
struct StoreState {
    merged: MergedAppointments,
    sequence: u64,
    tombstones: HashMap<AppointmentId, u64>,
    version: u64,
}

impl StoreState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

/// Owner of the merged appointment set and the published snapshot.
///
/// All bookkeeping is synchronous; the lock is never held across an await.
#[derive(Debug)]
pub struct AppointmentStore {
    state: Mutex<StoreState>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl Default for AppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentStore {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::empty());
        Self {
            state: Mutex::new(StoreState::default()),
            snapshot_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Number of appointments in the merged set, published or not.
    pub fn len(&self) -> usize {
        self.lock().merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().merged.is_empty()
    }

    pub fn get(&self, id: &AppointmentId) -> Option<Appointment> {
        self.lock().merged.get(id).cloned()
    }

    pub fn contains(&self, id: &AppointmentId) -> bool {
        self.lock().merged.contains(id)
    }

    /// Marks the start of a sync fetch.
    pub fn begin_sync(&self) -> SyncTicket {
        SyncTicket(self.lock().sequence)
    }

    /// Merges fetched appointments into the set.
    ///
    /// Only unknown ids are added, so merging is idempotent. Returns the
    /// number of appointments added.
    pub fn merge_fetched(
        &self,
        ticket: SyncTicket,
        fetched: impl IntoIterator<Item = Appointment>,
    ) -> usize {
        let mut state = self.lock();
        let mut added = 0;

        for appointment in fetched {
            if let Some(&removed_at) = state.tombstones.get(&appointment.id)
                && removed_at > ticket.0
            {
                trace!(id = %appointment.id, "skipping appointment removed after fetch started");
                continue;
            }
            if state.merged.insert_if_absent(appointment) {
                added += 1;
            }
        }

        let before = state.tombstones.len();
        state.tombstones.retain(|_, removed_at| *removed_at > ticket.0);
        let pruned = before - state.tombstones.len();

        debug!(
            added,
            pruned_tombstones = pruned,
            total = state.merged.len(),
            "merged fetched appointments"
        );
        added
    }

    /// Inserts or replaces an appointment, returning the previous entry.
    ///
    /// An explicit insert also clears any tombstone for the id.
    pub fn upsert(&self, appointment: Appointment) -> Option<Appointment> {
        let mut state = self.lock();
        state.tombstones.remove(&appointment.id);
        state.merged.upsert(appointment)
    }

    /// Inserts a new appointment and returns it as stored.
    ///
    /// An empty id, or one that is known or tombstoned, is replaced with a
    /// generated one.
    pub fn insert_new(&self, mut appointment: Appointment) -> Appointment {
        let mut state = self.lock();
        while appointment.id.is_empty()
            || state.merged.contains(&appointment.id)
            || state.tombstones.contains_key(&appointment.id)
        {
            let id = AppointmentId::generate();
            debug!(old = %appointment.id, new = %id, "assigning appointment id");
            appointment.id = id;
        }
        state.merged.upsert(appointment.clone());
        appointment
    }

    /// Replaces a known appointment with `edit(current)`.
    ///
    /// Returns the previous and the stored entry, or `None` if the id is not
    /// in the set. A removed appointment is never brought back.
    pub fn replace_if_present<F>(
        &self,
        id: &AppointmentId,
        edit: F,
    ) -> Option<(Appointment, Appointment)>
    where
        F: FnOnce(&Appointment) -> Appointment,
    {
        let mut state = self.lock();
        let current = state.merged.get(id)?;
        let mut replacement = edit(current);
        replacement.id = id.clone();
        let previous = state.merged.upsert(replacement.clone())?;
        Some((previous, replacement))
    }

    /// Undoes a hub write that the backend did not accept.
    ///
    /// Only acts while the entry is still exactly `written`: `previous` is
    /// put back, or the entry is dropped when there was none. Returns false
    /// when something else changed the entry in the meantime.
    pub fn revert(&self, written: &Appointment, previous: Option<Appointment>) -> bool {
        let mut state = self.lock();
        if state.merged.get(&written.id) != Some(written) {
            trace!(id = %written.id, "entry changed since write, not reverting");
            return false;
        }
        match previous {
            Some(previous) => {
                state.merged.upsert(previous);
            }
            None => {
                state.merged.remove(&written.id);
            }
        }
        true
    }

    /// Removes an appointment and leaves a pending tombstone for it.
    pub fn remove(&self, id: &AppointmentId) -> Option<Appointment> {
        let mut state = self.lock();
        let removed = state.merged.remove(id)?;
        state.tombstones.insert(id.clone(), PENDING);
        Some(removed)
    }

    /// Stamps the tombstone of a remove the backend has acknowledged.
    pub fn confirm_removed(&self, id: &AppointmentId) {
        let mut state = self.lock();
        if !state.tombstones.contains_key(id) {
            return;
        }
        let sequence = state.next_sequence();
        state.tombstones.insert(id.clone(), sequence);
    }

    /// Puts back an appointment whose remove failed.
    ///
    /// Nothing happens if the id was reused in the meantime.
    pub fn restore(&self, appointment: Appointment) -> bool {
        let mut state = self.lock();
        if state.tombstones.get(&appointment.id) != Some(&PENDING) {
            return false;
        }
        state.tombstones.remove(&appointment.id);
        state.merged.insert_if_absent(appointment)
    }

    /// Publishes the current merged set as a new snapshot.
    pub fn publish(&self) -> Snapshot {
        let snapshot = {
            let mut state = self.lock();
            state.version += 1;
            Snapshot {
                appointments: Arc::from(state.merged.to_sorted_vec()),
                version: state.version,
                published_at: Utc::now(),
            }
        };

        debug!(
            version = snapshot.version,
            count = snapshot.len(),
            "publishing snapshot"
        );
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    #[cfg(test)]
    fn tombstone_count(&self) -> usize {
        self.lock().tombstones.len()
    }
}
