use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The delivery time could not be projected to a future instant.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Underlying store error (sweep queries, startup scan).
    #[error("Store error: {0}")]
    Store(#[from] dailybrief_store::StoreError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
