use chrono::{DateTime, Utc};
use dailybrief_core::types::DeliveryTime;
use serde::{Deserialize, Serialize};

/// A persisted user schedule record.
///
/// `next_scheduled_run` is the engine's best-effort marker of the expected
/// next fire instant. It exists only for crash-recovery detection — while the
/// process is alive the in-memory timer table is the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserScheduleRecord {
    /// Opaque unique identifier — primary key.
    pub id: String,
    /// Account identity forwarded to the summary collaborator.
    pub email: String,
    /// Destination address for the summary; defaults to `email`.
    pub summary_email: String,
    /// Daily delivery time. `None` means "not scheduled".
    pub delivery_time: Option<DeliveryTime>,
    /// Last value the engine persisted as the expected next fire instant.
    pub next_scheduled_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserScheduleRecord {
    /// Minimal constructor for a user without a schedule yet.
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        let email = email.into();
        Self {
            id: id.into(),
            summary_email: email.clone(),
            email,
            delivery_time: None,
            next_scheduled_run: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_delivery_time(mut self, delivery_time: DeliveryTime) -> Self {
        self.delivery_time = Some(delivery_time);
        self
    }
}
