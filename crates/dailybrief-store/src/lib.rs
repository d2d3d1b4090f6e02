//! `dailybrief-store` — SQLite-backed user schedule records.
//!
//! The scheduler reads and writes three fields of the user record: the id,
//! the delivery-time preference and the persisted `next_scheduled_run`
//! marker. Everything else on the record belongs to the preference/auth
//! surface and is carried opaquely.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::SqliteUserStore;
pub use types::UserScheduleRecord;
