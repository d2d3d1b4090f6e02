use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// User-chosen local time-of-day at which the daily summary fires.
///
/// Stored on the user record; absence means "not scheduled". The scheduler
/// treats the fields as already validated — callers at the preference
/// boundary must go through [`DeliveryTime::validate`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTime {
    /// Hour of day, 0–23.
    pub hours: u8,
    /// Minute of hour, 0–59.
    pub minutes: u8,
}

impl DeliveryTime {
    pub fn new(hours: u8, minutes: u8) -> Result<Self> {
        let dt = Self { hours, minutes };
        dt.validate()?;
        Ok(dt)
    }

    /// Reject out-of-range fields before they reach the store or scheduler.
    pub fn validate(&self) -> Result<()> {
        if self.hours > 23 || self.minutes > 59 {
            return Err(CoreError::InvalidDeliveryTime {
                hours: self.hours,
                minutes: self.minutes,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for DeliveryTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hours, self.minutes)
    }
}
