//! `dailybrief-core` — shared configuration, error and preference types.

pub mod config;
pub mod error;
pub mod types;

pub use config::DailybriefConfig;
pub use error::{CoreError, Result};
pub use types::DeliveryTime;
