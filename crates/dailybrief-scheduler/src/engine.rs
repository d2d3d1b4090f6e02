use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{FixedOffset, Offset, Utc};
use tokio::sync::{oneshot, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use dailybrief_core::config::SchedulerConfig;
use dailybrief_store::{SqliteUserStore, UserScheduleRecord};

use crate::error::{Result, SchedulerError};
use crate::executor;
use crate::registry::{JobHandle, JobRegistry};
use crate::summary::SummaryGenerator;
use crate::sweep;
use crate::time::next_fire_instant;

struct Inner {
    store: SqliteUserStore,
    generator: Arc<dyn SummaryGenerator>,
    registry: JobRegistry,
    tz: FixedOffset,
    retry_delay: StdDuration,
    sweep_interval: StdDuration,
    shutdown: watch::Receiver<bool>,
}

/// The scheduling engine. Cheap to clone; all clones share one registry.
///
/// Every re-entry point — preference edits, timer fires, the recovery
/// sweep, startup — funnels into [`Scheduler::schedule_for_user`], which is
/// safe under concurrent invocation: per-user replacement serialises through
/// the registry and the last write wins with exactly one surviving handle.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        store: SqliteUserStore,
        generator: Arc<dyn SummaryGenerator>,
        config: &SchedulerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let tz = FixedOffset::east_opt(config.utc_offset_minutes * 60).unwrap_or_else(|| {
            warn!(
                offset_minutes = config.utc_offset_minutes,
                "utc offset out of range — falling back to UTC"
            );
            Utc.fix()
        });
        Self {
            inner: Arc::new(Inner {
                store,
                generator,
                registry: JobRegistry::new(),
                tz,
                retry_delay: StdDuration::from_secs(config.retry_delay_secs),
                sweep_interval: StdDuration::from_secs(config.sweep_interval_secs),
                shutdown,
            }),
        }
    }

    /// Startup sequence: catch up missed schedules first, then arm a fresh
    /// timer for every user with a delivery time (the registry starts empty
    /// on every restart), then keep the periodic sweep running.
    pub async fn start(&self) -> Result<()> {
        if let Err(e) = sweep::run_once(self, Utc::now()).await {
            // Startup must proceed even if catch-up fails; the periodic
            // sweep fires again in one interval.
            error!(error = %e, "startup sweep failed");
        }

        let users = self.inner.store.find_users_with_delivery_time()?;
        info!(count = users.len(), "arming schedules on startup");
        for user in &users {
            if let Err(e) = self.schedule_for_user(user) {
                error!(user_id = %user.id, error = %e, "failed to arm schedule");
            }
        }

        tokio::spawn(sweep::run_loop(self.clone()));
        Ok(())
    }

    /// Arm (or re-arm) the user's daily timer.
    ///
    /// A missing delivery time is the valid "unscheduled" state, not an
    /// error: any existing handle is cancelled and nothing is armed. On any
    /// failure the user is left unscheduled until the next sweep or update
    /// call — never armed for a stale preference.
    pub fn schedule_for_user(&self, user: &UserScheduleRecord) -> Result<()> {
        let Some(delivery) = user.delivery_time else {
            if self.inner.registry.cancel(&user.id) {
                info!(user_id = %user.id, "delivery time removed — unscheduled");
            }
            return Ok(());
        };

        self.inner.registry.cancel(&user.id);

        let now = Utc::now();
        let next_fire = next_fire_instant(delivery.hours, delivery.minutes, now, self.inner.tz)
            .ok_or_else(|| {
                SchedulerError::InvalidSchedule(format!(
                    "cannot project {delivery} to a future instant"
                ))
            })?;

        // Best-effort crash-recovery marker. In-memory correctness takes
        // priority over persistence freshness, so arming proceeds either way.
        if let Err(e) = self.inner.store.save_next_run(&user.id, Some(next_fire)) {
            warn!(user_id = %user.id, error = %e, "failed to persist next-run marker");
        }

        let token = Uuid::new_v4();
        let delay = (next_fire - now).to_std().unwrap_or_default();
        // Deadline is fixed here, at arm time, so it matches the `next_fire`
        // recorded in the registry and the persisted marker.
        let countdown = tokio::time::sleep(delay);
        let (armed_tx, armed_rx) = oneshot::channel::<()>();
        let scheduler = self.clone();
        let user_id = user.id.clone();
        let task = tokio::spawn(async move {
            // Hold the countdown until the handle is registered, so the
            // stale-token check below can never miss its own arming.
            if armed_rx.await.is_err() {
                return;
            }
            countdown.await;
            if !scheduler.inner.registry.is_current(&user_id, token) {
                // Cancelled or replaced while sleeping.
                return;
            }
            executor::handle_fire(&scheduler, &user_id).await;
        });
        self.inner
            .registry
            .set(&user.id, JobHandle::new(token, next_fire, task));
        let _ = armed_tx.send(());

        info!(user_id = %user.id, delivery = %delivery, next_fire = %next_fire, "timer armed");
        Ok(())
    }

    /// Re-entry point for preference edits. Safe to call repeatedly and
    /// concurrently; repeated calls for the same user converge to exactly
    /// one armed handle reflecting the latest preference.
    pub fn update_schedule(&self, user: &UserScheduleRecord) -> Result<()> {
        self.schedule_for_user(user)
    }

    /// Permanently drop the user's timer and clear the persisted marker.
    pub fn unschedule(&self, user_id: &str) {
        self.inner.registry.cancel(user_id);
        if let Err(e) = self.inner.store.save_next_run(user_id, None) {
            // Expected when the user record was already deleted.
            tracing::debug!(user_id, error = %e, "could not clear next-run marker");
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    pub fn store(&self) -> &SqliteUserStore {
        &self.inner.store
    }

    pub(crate) fn generator(&self) -> &dyn SummaryGenerator {
        self.inner.generator.as_ref()
    }

    pub(crate) fn retry_delay(&self) -> StdDuration {
        self.inner.retry_delay
    }

    pub(crate) fn sweep_interval(&self) -> StdDuration {
        self.inner.sweep_interval
    }

    pub(crate) fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.inner.shutdown.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::NullSummarizer;
    use dailybrief_core::types::DeliveryTime;
    use rusqlite::Connection;

    fn test_scheduler() -> Scheduler {
        let store = SqliteUserStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let (_tx, rx) = watch::channel(false);
        Scheduler::new(
            store,
            Arc::new(NullSummarizer),
            &SchedulerConfig::default(),
            rx,
        )
    }

    fn user(id: &str, hours: u8, minutes: u8) -> UserScheduleRecord {
        UserScheduleRecord::new(id, format!("{id}@example.com"))
            .with_delivery_time(DeliveryTime { hours, minutes })
    }

    #[tokio::test]
    async fn scheduling_twice_leaves_one_handle() {
        let scheduler = test_scheduler();
        let u = user("u1", 18, 0);
        scheduler.store().upsert_user(&u).unwrap();

        scheduler.schedule_for_user(&u).unwrap();
        scheduler.schedule_for_user(&u).unwrap();

        assert_eq!(scheduler.registry().len(), 1);
    }

    #[tokio::test]
    async fn no_delivery_time_means_unscheduled_not_error() {
        let scheduler = test_scheduler();
        let scheduled = user("u1", 18, 0);
        scheduler.store().upsert_user(&scheduled).unwrap();
        scheduler.schedule_for_user(&scheduled).unwrap();
        assert_eq!(scheduler.registry().len(), 1);

        let mut unscheduled = scheduled.clone();
        unscheduled.delivery_time = None;
        scheduler.schedule_for_user(&unscheduled).unwrap();
        assert!(scheduler.registry().is_empty());
    }

    #[tokio::test]
    async fn arming_persists_the_next_run_marker() {
        let scheduler = test_scheduler();
        let u = user("u1", 18, 0);
        scheduler.store().upsert_user(&u).unwrap();

        scheduler.schedule_for_user(&u).unwrap();

        let stored = scheduler
            .store()
            .find_user_by_id("u1")
            .unwrap()
            .unwrap()
            .next_scheduled_run
            .unwrap();
        let armed = scheduler.registry().scheduled_for("u1").unwrap();
        assert_eq!(stored.timestamp(), armed.timestamp());
        assert!(armed > Utc::now());
    }

    #[tokio::test]
    async fn marker_persistence_failure_still_arms() {
        let scheduler = test_scheduler();
        // Never upserted: save_next_run hits NotFound, arming must proceed.
        let u = user("ghost", 18, 0);
        scheduler.schedule_for_user(&u).unwrap();
        assert_eq!(scheduler.registry().len(), 1);
    }

    #[tokio::test]
    async fn unschedule_clears_timer_and_marker() {
        let scheduler = test_scheduler();
        let u = user("u1", 18, 0);
        scheduler.store().upsert_user(&u).unwrap();
        scheduler.schedule_for_user(&u).unwrap();

        scheduler.unschedule("u1");

        assert!(scheduler.registry().is_empty());
        let stored = scheduler.store().find_user_by_id("u1").unwrap().unwrap();
        assert!(stored.next_scheduled_run.is_none());
    }
}
