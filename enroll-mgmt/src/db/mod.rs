mod schema;

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use schema::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for common::ApiError {
    fn from(err: StoreError) -> Self {
        common::ApiError::internal(err)
    }
}

/// Enrollment of one participant in one study.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantEnrollment {
    pub participant_id: String,
    pub custom_study_id: String,
    pub status: String,
    pub enrolled_date: Option<DateTime<Utc>>,
    pub withdrawal_date: Option<DateTime<Utc>>,
}

pub trait EnrollmentStore: Send + Sync {
    /// Looks up a participant by app level participant id and the study's custom id.
    fn find_enrollment(
        &self,
        participant_id: &str,
        custom_study_id: &str,
    ) -> Result<Option<ParticipantEnrollment>, StoreError>;
}

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = participant_study_info)]
struct ParticipantStudyRow {
    status: String,
    enrolled_time: Option<DateTime<Utc>>,
    withdrawal_time: Option<DateTime<Utc>>,
}

pub struct PgStore {
    database_url: String,
}

impl PgStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        PgStore {
            database_url: database_url.into(),
        }
    }
}

impl EnrollmentStore for PgStore {
    fn find_enrollment(
        &self,
        participant_id: &str,
        custom_study_id: &str,
    ) -> Result<Option<ParticipantEnrollment>, StoreError> {
        let mut conn = PgConnection::establish(&self.database_url)?;

        let study_id: Option<String> = study_info::table
            .filter(study_info::custom_id.eq(custom_study_id))
            .select(study_info::id)
            .first(&mut conn)
            .optional()?;
        let Some(study_id) = study_id else {
            return Ok(None);
        };

        let row = participant_study_info::table
            .filter(participant_study_info::study_info_id.eq(&study_id))
            .filter(participant_study_info::participant_id.eq(participant_id))
            .select(ParticipantStudyRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(|row| ParticipantEnrollment {
            participant_id: participant_id.to_string(),
            custom_study_id: custom_study_id.to_string(),
            status: row.status,
            enrolled_date: row.enrolled_time,
            withdrawal_date: row.withdrawal_time,
        }))
    }
}

/// Enrollments keyed by participant id and custom study id.
#[derive(Default)]
pub struct InMemoryStore {
    enrollments: RwLock<HashMap<(String, String), ParticipantEnrollment>>,
    unavailable: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    pub fn unavailable() -> Self {
        InMemoryStore {
            enrollments: RwLock::default(),
            unavailable: true,
        }
    }

    pub fn insert(&self, enrollment: ParticipantEnrollment) -> Result<(), StoreError> {
        let key = (
            enrollment.participant_id.clone(),
            enrollment.custom_study_id.clone(),
        );
        self.enrollments
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?
            .insert(key, enrollment);
        Ok(())
    }
}

impl EnrollmentStore for InMemoryStore {
    fn find_enrollment(
        &self,
        participant_id: &str,
        custom_study_id: &str,
    ) -> Result<Option<ParticipantEnrollment>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        let enrollments = self
            .enrollments
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        Ok(enrollments
            .get(&(participant_id.to_string(), custom_study_id.to_string()))
            .cloned())
    }
}
