//! Background scheduler for calendar sync.
//!
//! The scheduler runs sync cycles on a fixed interval and on demand. A
//! cycle goes through three steps:
//!
//! 1. Fetch: every provider is asked for its appointments, in a spawned task.
//! 2. Merge: appointments with unknown ids are added to the store.
//! 3. Publish: a new snapshot is sent to subscribers.
//!
//! A faulted or cancelled cycle merges and publishes nothing, so the
//! previous snapshot stays current. Ticks and manual triggers that arrive
//! while a cycle is running are skipped.
//!
//! [`sync_once`] runs the same three steps once, without a scheduler.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{SchedulerError, SyncError};
use crate::store::{AppointmentStore, Snapshot};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval between timer-driven cycles.
    pub interval: Duration,
    /// When set, a failing provider is skipped instead of faulting the cycle.
    pub tolerate_partial_fetch: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            tolerate_partial_fetch: false,
        }
    }
}

impl SyncConfig {
    /// Creates a config with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Builder: skip failing providers instead of faulting the cycle.
    pub fn with_tolerate_partial_fetch(mut self, tolerate: bool) -> Self {
        self.tolerate_partial_fetch = tolerate;
        self
    }
}

/// Where the scheduler is in a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Merging,
    Published,
}

/// Commands that can be sent to the scheduler. Stopping goes through the
/// cancellation token instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerCommand {
    /// Start a cycle now, unless one is running.
    SyncNow,
}

/// Observable scheduler state.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    /// Cycles that published a snapshot.
    pub completed_cycles: u64,
    /// Cycles that faulted or were cancelled.
    pub failed_cycles: u64,
    pub consecutive_failures: u32,
    /// Last successful publish.
    pub last_sync: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    /// Set once the scheduler loop has exited.
    pub stopped: bool,
}

impl SyncStatus {
    fn record_success(&mut self) {
        self.completed_cycles += 1;
        self.consecutive_failures = 0;
        self.last_sync = Some(Utc::now());
        self.last_error = None;
    }

    fn record_failure(&mut self, error: &SyncError) {
        self.failed_cycles += 1;
        self.consecutive_failures += 1;
        self.last_error = Some(error.to_string());
    }
}

/// What a completed sync pass did.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Appointments added to the merged set.
    pub added: usize,
    /// The snapshot published at the end of the pass.
    pub snapshot: Snapshot,
}

/// Fetches every provider once, merges the result and publishes it.
///
/// On error nothing is merged or published.
pub async fn sync_once(
    catalog: &Catalog,
    store: &AppointmentStore,
    tolerate_partial_fetch: bool,
) -> Result<SyncReport, SyncError> {
    let never = CancellationToken::new();
    sync_pass(catalog, store, tolerate_partial_fetch, &never, |_| {}).await
}

async fn sync_pass(
    catalog: &Catalog,
    store: &AppointmentStore,
    tolerate_partial_fetch: bool,
    cancel: &CancellationToken,
    on_phase: impl Fn(SyncPhase),
) -> Result<SyncReport, SyncError> {
    on_phase(SyncPhase::Fetching);
    let ticket = store.begin_sync();

    let fetch = async {
        if tolerate_partial_fetch {
            Ok(catalog.appointments().await)
        } else {
            catalog.try_appointments().await
        }
    };

    let fetched = tokio::select! {
        _ = cancel.cancelled() => return Err(SyncError::Cancelled),
        result = fetch => result?,
    };
    debug!(count = fetched.len(), "fetch finished");

    // Past this point the pass runs to completion without suspending.
    on_phase(SyncPhase::Merging);
    let added = store.merge_fetched(ticket, fetched);

    let snapshot = store.publish();
    on_phase(SyncPhase::Published);
    Ok(SyncReport { added, snapshot })
}

type CycleResult = Result<SyncReport, SyncError>;
type CycleHandle = JoinHandle<CycleResult>;

/// Turns a joined cycle task into its outcome. Only an aborted task counts
/// as cancelled; a panic is a fault.
fn cycle_outcome(joined: Result<CycleResult, JoinError>) -> CycleResult {
    joined.unwrap_or_else(|e| {
        if e.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            warn!(error = %e, "sync cycle task failed");
            Err(SyncError::TaskFailed(e.to_string()))
        }
    })
}

/// Everything a spawned cycle needs.
#[derive(Clone)]
struct CycleContext {
    catalog: Arc<Catalog>,
    store: Arc<AppointmentStore>,
    status: Arc<watch::Sender<SyncStatus>>,
    tolerate_partial_fetch: bool,
}

impl CycleContext {
    fn set_phase(&self, phase: SyncPhase) {
        self.status.send_modify(|s| s.phase = phase);
    }

    async fn run(self, cancel: CancellationToken) -> CycleResult {
        sync_pass(
            &self.catalog,
            &self.store,
            self.tolerate_partial_fetch,
            &cancel,
            |phase| self.set_phase(phase),
        )
        .await
    }
}

/// The scheduler drives periodic sync cycles.
pub struct SyncScheduler {
    config: SyncConfig,
    context: CycleContext,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    cancel: CancellationToken,
}

impl SyncScheduler {
    pub fn new(config: SyncConfig, catalog: Arc<Catalog>, store: Arc<AppointmentStore>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (status, _) = watch::channel(SyncStatus::default());
        Self {
            context: CycleContext {
                catalog,
                store,
                status: Arc::new(status),
                tolerate_partial_fetch: config.tolerate_partial_fetch,
            },
            config,
            command_tx,
            command_rx,
            cancel: CancellationToken::new(),
        }
    }

    /// Returns a handle for controlling the scheduler.
    pub fn handle(&self) -> SyncHandle {
        SyncHandle {
            command_tx: self.command_tx.clone(),
            store: self.context.store.clone(),
            status: self.context.status.subscribe(),
            cancel: self.cancel.clone(),
        }
    }

    /// Spawns the scheduler loop on the current runtime.
    pub fn spawn(self) -> (SyncHandle, JoinHandle<()>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    /// Runs the scheduler loop until stopped.
    ///
    /// The first cycle starts immediately.
    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            tolerate_partial_fetch = self.config.tolerate_partial_fetch,
            "Sync scheduler started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycle: Option<CycleHandle> = None;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Sync scheduler cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.start_cycle(&mut cycle, "timer");
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(SchedulerCommand::SyncNow) => {
                        self.start_cycle(&mut cycle, "manual");
                    }
                    None => {
                        info!("Sync scheduler stopping");
                        break;
                    }
                },
                joined = join_cycle(&mut cycle), if cycle.is_some() => {
                    cycle = None;
                    self.finish_cycle(joined);
                }
            }
        }

        self.cancel.cancel();
        if let Some(running) = cycle.take() {
            debug!("waiting for cancelled cycle");
            self.finish_cycle(running.await);
        }
        self.command_rx.close();
        self.context.status.send_modify(|s| {
            s.phase = SyncPhase::Idle;
            s.stopped = true;
        });
    }

    fn start_cycle(&self, cycle: &mut Option<CycleHandle>, trigger: &'static str) {
        if cycle.is_some() {
            debug!(trigger, "sync cycle already running, skipping");
            return;
        }
        debug!(trigger, "starting sync cycle");
        let context = self.context.clone();
        *cycle = Some(tokio::spawn(context.run(self.cancel.child_token())));
    }

    fn finish_cycle(&self, joined: Result<CycleResult, JoinError>) {
        match cycle_outcome(joined) {
            Ok(report) => {
                info!(
                    added = report.added,
                    version = report.snapshot.version(),
                    total = report.snapshot.len(),
                    "Sync completed successfully"
                );
                self.context.status.send_modify(|s| {
                    s.record_success();
                    s.phase = SyncPhase::Idle;
                });
            }
            Err(e) => {
                warn!(error = %e, "Sync failed, keeping previous snapshot");
                self.context.status.send_modify(|s| {
                    s.record_failure(&e);
                    s.phase = SyncPhase::Idle;
                });
            }
        }
    }
}

async fn join_cycle(cycle: &mut Option<CycleHandle>) -> Result<CycleResult, JoinError> {
    match cycle {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Handle for controlling a running scheduler and reading what it
/// publishes.
#[derive(Clone, Debug)]
pub struct SyncHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    store: Arc<AppointmentStore>,
    status: watch::Receiver<SyncStatus>,
    cancel: CancellationToken,
}

impl SyncHandle {
    /// Requests a cycle now. Skipped if one is already running.
    pub async fn sync_now(&self) -> Result<(), SchedulerError> {
        self.command_tx
            .send(SchedulerCommand::SyncNow)
            .await
            .map_err(|_| SchedulerError::Stopped)
    }

    /// Stops the scheduler, cancelling the running cycle.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Subscribes to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.store.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    pub fn phase(&self) -> SyncPhase {
        self.status.borrow().phase
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to scheduler state changes.
    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.status.borrow().stopped
    }
}
