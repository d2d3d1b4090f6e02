//! Missed-schedule recovery.
//!
//! Timers live only in memory, so a restart spanning a user's fire instant
//! would silently drop that day's summary. The sweep closes that gap: any
//! user whose persisted `next_scheduled_run` has already elapsed gets one
//! immediate catch-up run (the day's run, delayed) and a fresh timer.

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::engine::Scheduler;
use crate::error::Result;
use crate::executor;

/// One sweep pass. Returns how many missed schedules were caught up.
/// Per-user failures are logged inside the catch-up pipeline and do not
/// abort the rest of the pass.
pub async fn run_once(scheduler: &Scheduler, now: DateTime<Utc>) -> Result<usize> {
    let missed = scheduler.store().find_users_with_past_next_run(now)?;
    if missed.is_empty() {
        debug!("no missed schedules");
        return Ok(0);
    }

    info!(count = missed.len(), "processing missed schedules");
    for user in &missed {
        debug!(
            user_id = %user.id,
            missed_at = ?user.next_scheduled_run,
            "catching up missed schedule"
        );
        executor::deliver_and_rearm(scheduler, user).await;
    }
    Ok(missed.len())
}

/// Periodic sweep loop. Runs until the shutdown signal flips; a failed pass
/// is logged and the cadence continues — the sweep's own timer must survive
/// anything a single pass can throw.
pub async fn run_loop(scheduler: Scheduler) {
    let mut shutdown = scheduler.shutdown_rx();
    let mut interval = tokio::time::interval(scheduler.sweep_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick resolves immediately; startup already swept.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match run_once(&scheduler, Utc::now()).await {
                    Ok(count) if count > 0 => {
                        info!(count, "sweep caught up missed schedules");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "missed-schedule sweep failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("sweep loop shutting down");
                    break;
                }
            }
        }
    }
}
