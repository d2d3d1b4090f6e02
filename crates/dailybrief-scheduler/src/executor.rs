//! What happens when a timer fires.
//!
//! The fired task carries only a user id, never a cached record: acting on
//! preferences captured at arm time would miss every edit made during the
//! up-to-24-hour sleep. The re-read here is deliberate, not incidental.

use tracing::{debug, error, info, warn};

use dailybrief_store::UserScheduleRecord;

use crate::engine::Scheduler;
use crate::summary::SummaryError;

/// Timer-fire entry point. Never panics, never returns an error — every
/// outcome is logged and, where a user still exists, re-armed.
pub(crate) async fn handle_fire(scheduler: &Scheduler, user_id: &str) {
    let user = match scheduler.store().find_user_by_id(user_id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            // Deleted between arming and firing — expected churn, terminal
            // for this job. No generation, no reschedule, handle dropped.
            debug!(user_id, "user record gone at fire time — dropping job");
            scheduler.unschedule(user_id);
            return;
        }
        Err(e) => {
            warn!(user_id, error = %e, "fetch at fire time failed — next sweep will recover");
            return;
        }
    };
    deliver_and_rearm(scheduler, &user).await;
}

/// Generate (with one optional retry) and then re-arm — in that order, and
/// the re-arm happens regardless of the generation outcome. A transient
/// failure degrades to one missed day, never to a permanently stopped user.
pub(crate) async fn deliver_and_rearm(scheduler: &Scheduler, user: &UserScheduleRecord) {
    if let Err(e) = generate_with_retry(scheduler, user).await {
        error!(user_id = %user.id, error = %e, "summary generation failed for today");
    }

    if let Err(e) = scheduler.schedule_for_user(user) {
        error!(user_id = %user.id, error = %e, "re-arm failed — next sweep will retry");
    }
}

async fn generate_with_retry(
    scheduler: &Scheduler,
    user: &UserScheduleRecord,
) -> Result<(), SummaryError> {
    let generator = scheduler.generator();
    match generator.generate_and_send(user).await {
        Ok(()) => {
            info!(user_id = %user.id, generator = generator.name(), "summary delivered");
            Ok(())
        }
        Err(first) => {
            let delay = scheduler.retry_delay();
            if delay.is_zero() {
                return Err(first);
            }
            warn!(
                user_id = %user.id,
                error = %first,
                retry_in_secs = delay.as_secs(),
                "generation failed — retrying once"
            );
            tokio::time::sleep(delay).await;
            generator.generate_and_send(user).await
        }
    }
}
