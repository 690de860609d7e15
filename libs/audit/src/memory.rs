use std::sync::Mutex;

use async_trait::async_trait;

use crate::{AuditError, AuditEvent, AuditSink, EventCode};

/// Keeps every recorded event in memory. Used by service tests to check
/// which events an action emitted.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: bool,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        InMemoryAuditSink::default()
    }

    /// A sink whose every `record` call fails.
    pub fn failing() -> Self {
        InMemoryAuditSink {
            events: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn events_with_code(&self, code: EventCode) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event_code == code)
            .collect()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), AuditError> {
        if self.failing {
            return Err(AuditError::Queue("audit sink unavailable".to_string()));
        }
        self.events
            .lock()
            .map_err(|_| AuditError::Queue("audit sink lock poisoned".to_string()))?
            .push(event.clone());
        Ok(())
    }
}
