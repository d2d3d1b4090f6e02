//! `dailybrief-scheduler` — per-user recurring-job scheduling and recovery.
//!
//! # Overview
//!
//! Every user with a delivery-time preference gets exactly one armed timer
//! at a time, held in an in-memory [`registry::JobRegistry`]. A fired timer
//! re-fetches the user record, invokes the summary collaborator, and re-arms
//! itself for the next day — regardless of whether generation succeeded, so
//! a transient failure costs at most one day, never all future days.
//!
//! Timers do not survive restarts. Recovery relies on a best-effort
//! persisted `next_scheduled_run` marker: the [`sweep`] runs at startup and
//! every 15 minutes, catches up any user whose marker has elapsed, and
//! re-arms them. The [`heartbeat`] loop keeps the process from being
//! suspended by idle-throttling hosts.
//!
//! # Re-entry points
//!
//! | Caller              | Entry                                |
//! |---------------------|--------------------------------------|
//! | Preference edit     | [`engine::Scheduler::update_schedule`] |
//! | Timer fire          | [`executor`] (internal)              |
//! | Startup / sweep     | [`engine::Scheduler::start`]         |

pub mod engine;
pub mod error;
pub mod executor;
pub mod heartbeat;
pub mod registry;
pub mod summary;
pub mod sweep;
pub mod time;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use registry::JobRegistry;
pub use summary::{NullSummarizer, SummaryError, SummaryGenerator, WebhookSummarizer};
