use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One armed timer for one user. Process-memory only — handles never
/// survive a restart.
pub struct JobHandle {
    /// Identifies this particular arming. A fired timer task re-checks its
    /// token against the registry before executing, so a replaced or
    /// cancelled arming can never run.
    token: Uuid,
    /// The instant this handle is armed to fire. Strictly in the future at
    /// creation time.
    scheduled_for: DateTime<Utc>,
    task: JoinHandle<()>,
}

impl JobHandle {
    pub fn new(token: Uuid, scheduled_for: DateTime<Utc>, task: JoinHandle<()>) -> Self {
        Self {
            token,
            scheduled_for,
            task,
        }
    }

    pub fn scheduled_for(&self) -> DateTime<Utc> {
        self.scheduled_for
    }
}

/// In-memory table of armed timers, at most one per user.
///
/// Replace and cancel hold the key's shard lock for the whole swap: no
/// caller ever observes two live handles for the same user, and the old
/// handle's task is aborted as part of the same operation.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<String, JobHandle>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handle` for `user_id`, cancelling and replacing any prior
    /// handle. Last write wins under concurrent calls for the same user.
    pub fn set(&self, user_id: &str, handle: JobHandle) {
        if let Some(prev) = self.jobs.insert(user_id.to_string(), handle) {
            prev.task.abort();
        }
    }

    /// Cancel and remove the user's handle if present; no-op otherwise.
    /// Returns true when a handle was actually cancelled.
    pub fn cancel(&self, user_id: &str) -> bool {
        match self.jobs.remove(user_id) {
            Some((_, handle)) => {
                handle.task.abort();
                true
            }
            None => false,
        }
    }

    /// Stale-fire guard: is `token` still the registered arming for this
    /// user? A timer task that slept past its target calls this before
    /// doing any work; a false answer means it was cancelled or replaced
    /// while sleeping and must exit silently.
    pub fn is_current(&self, user_id: &str, token: Uuid) -> bool {
        self.jobs
            .get(user_id)
            .is_some_and(|handle| handle.token == token)
    }

    pub fn scheduled_for(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.jobs.get(user_id).map(|handle| handle.scheduled_for)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Diagnostic snapshot of (user id, armed instant) pairs.
    pub fn snapshot(&self) -> Vec<(String, DateTime<Utc>)> {
        self.jobs
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().scheduled_for))
            .collect()
    }
}
