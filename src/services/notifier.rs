//! Notification sink collaborator
//!
//! Sinks receive structured lifecycle events. Delivery is best-effort:
//! failures are logged and swallowed, the triggering operation is never
//! rolled back or blocked by the sink.

use async_trait::async_trait;
use std::time::Duration;

use crate::{
    config::NotifierConfig,
    error::{AppError, AppResult},
    models::Event,
};

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn emit(&self, event: &Event) -> AppResult<()>;
}

/// Emit an event, logging (never propagating) sink failures
pub async fn dispatch(sink: &dyn NotificationSink, event: Event) {
    if let Err(e) = sink.emit(&event).await {
        tracing::warn!(event = event.kind(), error = %e, "notification sink failed");
    }
}

/// Sink that POSTs each event as JSON to a configured webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, config: &NotifierConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build webhook client: {}", e)))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn emit(&self, event: &Event) -> AppResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("webhook delivery failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "webhook rejected event with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Sink that drops every event; used when no webhook is configured
pub struct NullNotifier;

#[async_trait]
impl NotificationSink for NullNotifier {
    async fn emit(&self, _event: &Event) -> AppResult<()> {
        Ok(())
    }
}

/// In-memory sink capturing events, for tests and local development
#[derive(Default)]
pub struct RecordingSink {
    events: tokio::sync::Mutex<Vec<Event>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn emit(&self, event: &Event) -> AppResult<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}
