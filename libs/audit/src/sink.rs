use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;

use crate::{AuditError, AuditEvent};

/// Log stream every audit event is written to.
pub const AUDIT_LOG_NAME: &str = "application-audit-log";

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Writes each event as JSON on the `application-audit-log` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let details = serde_json::to_string(event)?;
        tracing::info!(
            target: AUDIT_LOG_NAME,
            event_code = %event.event_code,
            "{} event details {}",
            event.event_code,
            details
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAuditSink;

#[async_trait]
impl AuditSink for DisabledAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        tracing::debug!("Audit disabled, dropping {} event", event.event_code);
        Ok(())
    }
}

/// Sends each event to the audit SQS queue, drained by the audit log writer.
pub struct QueueAuditSink {
    client: Client,
    queue_url: String,
}

impl QueueAuditSink {
    pub fn new(client: Client, queue_url: impl Into<String>) -> Self {
        QueueAuditSink {
            client,
            queue_url: queue_url.into(),
        }
    }
}

#[async_trait]
impl AuditSink for QueueAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let serialized_event = serde_json::to_string(event)?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(serialized_event)
            .send()
            .await
            .map_err(|err| AuditError::Queue(DisplayErrorContext(&err).to_string()))?;

        tracing::debug!("{} event queued", event.event_code);
        Ok(())
    }
}
