//! Summary-generation collaborator boundary.
//!
//! The scheduler never owns email-content semantics. It hands a fresh user
//! record to a [`SummaryGenerator`] and only cares about success or failure;
//! fetching the unread mail, composing the digest and sending it live
//! entirely behind this trait.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use dailybrief_store::UserScheduleRecord;

#[derive(Debug, Error)]
pub enum SummaryError {
    /// No generation service configured — the fire is a no-op but still
    /// counts as a failed attempt.
    #[error("No summary generator configured")]
    NotConfigured,

    /// The generation service answered with a non-success status.
    #[error("Summary service error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure reaching the generation service.
    #[error("Summary transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Generates and sends one day's summary for one user.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate_and_send(&self, user: &UserScheduleRecord) -> Result<(), SummaryError>;
}

/// Delegates generation to an external HTTP service.
///
/// POSTs the user's identity to the configured endpoint; the service fetches
/// the unread mail, writes the digest and delivers it.
pub struct WebhookSummarizer {
    client: reqwest::Client,
    endpoint_url: String,
}

impl WebhookSummarizer {
    pub fn new(endpoint_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint_url,
        }
    }
}

#[async_trait]
impl SummaryGenerator for WebhookSummarizer {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn generate_and_send(&self, user: &UserScheduleRecord) -> Result<(), SummaryError> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .json(&json!({
                "user_id": user.id,
                "email": user.email,
                "summary_email": user.summary_email,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SummaryError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        debug!(user_id = %user.id, "summary service accepted request");
        Ok(())
    }
}

/// Placeholder when no endpoint is configured. Always fails, which still
/// exercises the re-arm path — scheduling stays correct, delivery waits for
/// configuration.
pub struct NullSummarizer;

#[async_trait]
impl SummaryGenerator for NullSummarizer {
    fn name(&self) -> &str {
        "null"
    }

    async fn generate_and_send(&self, _user: &UserScheduleRecord) -> Result<(), SummaryError> {
        Err(SummaryError::NotConfigured)
    }
}
