mod schema;

use diesel::prelude::*;
use serde_json::Value;

use audit::AuditEvent;

use schema::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("insert failed: {0}")]
    Query(#[from] diesel::result::Error),
}

pub trait EventStore {
    fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError>;
}

// id and created_at are filled in by the database
#[derive(Debug, PartialEq, Insertable)]
#[diesel(table_name = audit_event)]
pub struct InsertAuditEvent {
    pub event_code: String,
    pub source: String,
    pub user_id: Option<String>,
    pub study_id: Option<String>,
    pub site_id: Option<String>,
    pub app_id: Option<String>,
    pub participant_id: Option<String>,
    pub description: Option<String>,
    pub event_details: Option<Value>,
    pub occurred: chrono::DateTime<chrono::Utc>,
}

impl From<&AuditEvent> for InsertAuditEvent {
    fn from(event: &AuditEvent) -> Self {
        let text = |value: &Option<String>| value.as_deref().map(strip_nul);

        InsertAuditEvent {
            event_code: event.event_code.as_str().to_string(),
            source: strip_nul(&event.source),
            user_id: text(&event.user_id),
            study_id: text(&event.study_id),
            site_id: text(&event.site_id),
            app_id: text(&event.app_id),
            participant_id: text(&event.participant_id),
            description: text(&event.description),
            event_details: serde_json::to_value(event).ok().map(|mut value| {
                sanitize_json(&mut value);
                value
            }),
            occurred: event.occurred,
        }
    }
}

pub struct PgEventStore {
    database_url: String,
}

impl PgEventStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        PgEventStore {
            database_url: database_url.into(),
        }
    }
}

impl EventStore for PgEventStore {
    fn insert_audit_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let mut conn = PgConnection::establish(&self.database_url)?;

        diesel::insert_into(audit_event::table)
            .values(&InsertAuditEvent::from(event))
            .execute(&mut conn)?;

        Ok(())
    }
}

// null bytes are not allowed in PostgreSQL text and jsonb fields
fn strip_nul(value: &str) -> String {
    value.replace('\0', "")
}

fn sanitize_json(value: &mut Value) {
    match value {
        Value::String(s) => *s = strip_nul(s),
        Value::Array(arr) => {
            for v in arr {
                sanitize_json(v);
            }
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                sanitize_json(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use audit::EventCode;
    use serde_json::json;

    use super::*;

    #[test]
    fn sanitize_removes_nul_bytes_everywhere() {
        let mut value = json!({
            "a": "x\0y",
            "b": ["\0", 1, null],
            "c": { "d": "ok\0" }
        });
        sanitize_json(&mut value);
        assert_eq!(value, json!({ "a": "xy", "b": ["", 1, null], "c": { "d": "ok" } }));
    }

    #[test]
    fn row_copies_identifiers_and_strips_text() {
        let event = AuditEvent::new(EventCode::NewLocationAdded, "participant-manager-datastore")
            .user("admin-1")
            .description("New location BOS\0-01 added");

        let row = InsertAuditEvent::from(&event);

        assert_eq!(row.event_code, "NEW_LOCATION_ADDED");
        assert_eq!(row.user_id.as_deref(), Some("admin-1"));
        assert_eq!(row.study_id, None);
        assert_eq!(row.description.as_deref(), Some("New location BOS-01 added"));
        let details = row.event_details.unwrap();
        assert_eq!(details["description"], "New location BOS-01 added");
        assert_eq!(details["eventCode"], "NEW_LOCATION_ADDED");
        assert_eq!(row.occurred, event.occurred);
    }
}
