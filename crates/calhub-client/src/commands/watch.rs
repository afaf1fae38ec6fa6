//! `calhub watch`
//!
//! Runs the sync scheduler in the foreground and prints every snapshot it
//! publishes until interrupted.

use std::time::Duration;

use tracing::{info, warn};

use calhub_server::{Snapshot, SyncConfig, SyncScheduler};

use super::{Session, appointments, print_json};
use crate::error::ClientResult;

pub async fn run(session: &Session, mut config: SyncConfig, json: bool) -> ClientResult<()> {
    if config.interval.is_zero() {
        config.interval = Duration::from_secs(1);
    }
    info!(interval = ?config.interval, "watching calendars");

    let scheduler = SyncScheduler::new(config, session.catalog().clone(), session.store().clone());
    let (handle, task) = scheduler.spawn();
    let mut snapshots = handle.subscribe();
    let mut status = handle.watch_status();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted, stopping sync");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(&snapshot, json)?;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                if let Some(ref error) = current.last_error
                    && current.consecutive_failures > 0
                {
                    warn!(failures = current.consecutive_failures, %error, "sync failing");
                }
                if current.stopped {
                    break;
                }
            }
        }
    }

    handle.stop();
    if let Err(e) = task.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, json: bool) -> ClientResult<()> {
    if json {
        return print_json(&serde_json::json!({
            "version": snapshot.version(),
            "published_at": snapshot.published_at(),
            "appointments": snapshot.appointments(),
        }));
    }
    println!(
        "--- {} appointments (version {}, {})",
        snapshot.len(),
        snapshot.version(),
        snapshot.published_at().with_timezone(&chrono::Local).format("%H:%M:%S")
    );
    appointments::print_list(snapshot.appointments());
    Ok(())
}
