use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::Message;

use audit::AuditEvent;

use crate::db::EventStore;

/// What to do with a queue message once it has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Delete,
    /// Left on the queue so it is delivered again.
    Retain,
}

/// Persists one message body. Bodies that are missing or not an audit event
/// can never succeed and are dropped.
pub fn handle_message(body: Option<&str>, store: &dyn EventStore) -> Disposition {
    let Some(body) = body else {
        tracing::warn!("Received message with no body, skipping.");
        return Disposition::Delete;
    };

    let event: AuditEvent = match serde_json::from_str(body) {
        Ok(event) => event,
        Err(err) => {
            tracing::error!("Failed to parse message body as audit event: {}", err);
            return Disposition::Delete;
        }
    };

    match store.insert_audit_event(&event) {
        Ok(()) => {
            tracing::info!("Stored audit event {} from {}", event.event_code, event.source);
            Disposition::Delete
        }
        Err(err) => {
            tracing::error!("Error inserting audit event into database: {}", err);
            Disposition::Retain
        }
    }
}

pub async fn receive_messages(
    client: &Client,
    queue_url: &str,
    batch_size: i32,
) -> Result<Vec<Message>, aws_sdk_sqs::Error> {
    let output = client
        .receive_message()
        .queue_url(queue_url)
        .max_number_of_messages(batch_size.clamp(1, 10))
        .send()
        .await?;

    Ok(output.messages.unwrap_or_default())
}

pub async fn delete_message(
    client: &Client,
    queue_url: &str,
    receipt_handle: &str,
) -> Result<(), aws_sdk_sqs::Error> {
    client
        .delete_message()
        .queue_url(queue_url)
        .receipt_handle(receipt_handle)
        .send()
        .await?;

    tracing::debug!("Message deleted successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use audit::EventCode;

    use super::*;
    use crate::db::StoreError;

    #[derive(Default)]
    struct RecordingStore {
        events: Mutex<Vec<AuditEvent>>,
        failing: bool,
    }

    impl EventStore for RecordingStore {
        fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
            if self.failing {
                return Err(StoreError::Query(diesel::result::Error::BrokenTransactionManager));
            }
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    fn body() -> String {
        let event = AuditEvent::new(EventCode::EnrollmentTargetUpdated, "participant-manager-datastore")
            .user("admin-1")
            .study("study-1")
            .site("site-1");
        serde_json::to_string(&event).unwrap()
    }

    #[test]
    fn stored_event_is_deleted() {
        let store = RecordingStore::default();

        assert_eq!(handle_message(Some(&body()), &store), Disposition::Delete);

        let events = store.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_code, EventCode::EnrollmentTargetUpdated);
        assert_eq!(events[0].site_id.as_deref(), Some("site-1"));
    }

    #[test]
    fn unparseable_and_empty_messages_are_dropped() {
        let store = RecordingStore::default();

        assert_eq!(handle_message(Some("{not json"), &store), Disposition::Delete);
        assert_eq!(
            handle_message(Some(r#"{"eventCode":"UNKNOWN"}"#), &store),
            Disposition::Delete
        );
        assert_eq!(handle_message(None, &store), Disposition::Delete);
        assert!(store.events.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_insert_is_retained_for_redelivery() {
        let store = RecordingStore {
            failing: true,
            ..RecordingStore::default()
        };

        assert_eq!(handle_message(Some(&body()), &store), Disposition::Retain);
    }
}
