//! Audit trail for significant user actions.
//!
//! Handlers build an [`AuditEvent`] and hand it to an [`AuditSink`]. The
//! default sink writes the serialized event to the `application-audit-log`
//! tracing target; the queue sink forwards it to SQS for the audit log
//! writer to persist. Recording failures are returned to the caller.

mod event;
mod memory;
mod sink;

use std::sync::Arc;

use serde::Deserialize;

pub use event::{AuditEvent, EventCode};
pub use memory::InMemoryAuditSink;
pub use sink::{AUDIT_LOG_NAME, AuditSink, DisabledAuditSink, LogAuditSink, QueueAuditSink};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("failed to serialize audit event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to send audit event to queue: {0}")]
    Queue(String),

    #[error("invalid audit configuration: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Log,
    Queue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditSettings {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub sink: SinkKind,
    pub queue_url: Option<String>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            enabled: true,
            sink: SinkKind::Log,
            queue_url: None,
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// Builds the sink selected by `settings`.
pub async fn sink_from_settings(settings: &AuditSettings) -> Result<Arc<dyn AuditSink>, AuditError> {
    if !settings.enabled {
        tracing::warn!("Audit logging is disabled");
        return Ok(Arc::new(DisabledAuditSink));
    }

    match settings.sink {
        SinkKind::Log => Ok(Arc::new(LogAuditSink)),
        SinkKind::Queue => {
            let queue_url = settings
                .queue_url
                .clone()
                .ok_or_else(|| AuditError::Config("audit.queue_url must be set".to_string()))?;
            let client = aws_sdk_sqs::Client::new(&aws_config::load_from_env().await);
            Ok(Arc::new(QueueAuditSink::new(client, queue_url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_sink_requires_url() {
        let settings = AuditSettings {
            enabled: true,
            sink: SinkKind::Queue,
            queue_url: None,
        };
        let err = sink_from_settings(&settings).await.err().unwrap();
        assert!(matches!(err, AuditError::Config(_)));
    }

    #[tokio::test]
    async fn disabled_sink_accepts_everything() {
        let settings = AuditSettings {
            enabled: false,
            ..AuditSettings::default()
        };
        let sink = sink_from_settings(&settings).await.unwrap();
        let event = AuditEvent::new(EventCode::NewLocationAdded, "test");
        assert!(sink.record(&event).await.is_ok());
    }
}
