//! Entities of the participant manager and the repositories that load them.
//!
//! Each repository trait is a small capability set over one entity. The
//! service only ever talks to a [`Store`], which is every repository at once;
//! [`PgStore`] backs it with PostgreSQL and [`InMemoryStore`] with maps.

mod memory;
mod postgres;
mod schema;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use auth_check::{LookupError, UserLookup, UserStatus};
use common::PageRequest;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("unexpected value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("unique constraint {0} violated")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for common::ApiError {
    fn from(err: StoreError) -> Self {
        common::ApiError::internal(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyType {
    Open,
    Close,
}

impl StudyType {
    pub fn code(&self) -> &'static str {
        match self {
            StudyType::Open => "OPEN",
            StudyType::Close => "CLOSE",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "OPEN" => Some(StudyType::Open),
            "CLOSE" => Some(StudyType::Close),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStatus {
    Active,
    Deactive,
}

impl SiteStatus {
    pub fn value(&self) -> i32 {
        match self {
            SiteStatus::Active => 1,
            SiteStatus::Deactive => 0,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(SiteStatus::Active),
            0 => Some(SiteStatus::Deactive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    Active,
    Inactive,
}

impl LocationStatus {
    pub fn value(&self) -> i32 {
        match self {
            LocationStatus::Active => 1,
            LocationStatus::Inactive => 0,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            1 => Some(LocationStatus::Active),
            0 => Some(LocationStatus::Inactive),
            _ => None,
        }
    }
}

/// View or edit rights on a study, site or the location list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Permission {
    View,
    Edit,
}

impl Permission {
    pub fn value(&self) -> i32 {
        match self {
            Permission::View => 0,
            Permission::Edit => 1,
        }
    }

    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Permission::View),
            1 => Some(Permission::Edit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStatus {
    New,
    Invited,
    Enrolled,
    Disabled,
}

impl OnboardingStatus {
    pub fn code(&self) -> &'static str {
        match self {
            OnboardingStatus::New => "N",
            OnboardingStatus::Invited => "I",
            OnboardingStatus::Enrolled => "E",
            OnboardingStatus::Disabled => "D",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            OnboardingStatus::New => "New",
            OnboardingStatus::Invited => "Invited",
            OnboardingStatus::Enrolled => "Enrolled",
            OnboardingStatus::Disabled => "Disabled",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "N" => Some(OnboardingStatus::New),
            "I" => Some(OnboardingStatus::Invited),
            "E" => Some(OnboardingStatus::Enrolled),
            "D" => Some(OnboardingStatus::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStatus {
    YetToEnroll,
    NotEligible,
    Enrolled,
    Withdrawn,
}

impl EnrollmentStatus {
    pub fn code(&self) -> &'static str {
        match self {
            EnrollmentStatus::YetToEnroll => "yetToEnroll",
            EnrollmentStatus::NotEligible => "notEligible",
            EnrollmentStatus::Enrolled => "inProgress",
            EnrollmentStatus::Withdrawn => "withdrawn",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            EnrollmentStatus::YetToEnroll => "Yet to enroll",
            EnrollmentStatus::NotEligible => "Not eligible",
            EnrollmentStatus::Enrolled => "Enrolled",
            EnrollmentStatus::Withdrawn => "Withdrawn",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "yetToEnroll" => Some(EnrollmentStatus::YetToEnroll),
            "notEligible" => Some(EnrollmentStatus::NotEligible),
            // older rows carry the display value
            "inProgress" | "Enrolled" => Some(EnrollmentStatus::Enrolled),
            "withdrawn" => Some(EnrollmentStatus::Withdrawn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub active: bool,
    pub super_admin: bool,
    pub location_permission: Option<Permission>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub id: String,
    pub custom_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Study {
    pub id: String,
    pub custom_id: String,
    pub name: String,
    pub app_id: Option<String>,
    pub study_type: StudyType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub custom_id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: LocationStatus,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub id: String,
    pub study_id: String,
    pub location_id: Option<String>,
    pub status: SiteStatus,
    pub target_enrollment: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitePermission {
    pub id: String,
    pub user_id: String,
    pub site_id: String,
    pub study_id: String,
    pub app_id: Option<String>,
    pub edit: Permission,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudyPermission {
    pub id: String,
    pub user_id: String,
    pub study_id: String,
    pub app_id: Option<String>,
    pub edit: Permission,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRegistrySite {
    pub id: String,
    pub site_id: String,
    pub study_id: String,
    pub email: String,
    pub onboarding_status: OnboardingStatus,
    pub invitation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantStudy {
    pub id: String,
    pub participant_registry_site_id: Option<String>,
    pub study_id: String,
    pub site_id: Option<String>,
    pub participant_id: Option<String>,
    pub status: EnrollmentStatus,
    pub enrolled_date: Option<DateTime<Utc>>,
    pub withdrawal_date: Option<DateTime<Utc>>,
}

/// Which studies to return, newest first.
#[derive(Debug, Clone, Default)]
pub struct StudySearch {
    /// `None` means every study.
    pub study_ids: Option<Vec<String>>,
    pub search_term: Option<String>,
    pub page: PageRequest,
}

pub trait UserRepository {
    fn find_user(&self, user_id: &str) -> Result<Option<AdminUser>, StoreError>;
    fn save_user(&self, user: &AdminUser) -> Result<(), StoreError>;
}

pub trait AppRepository {
    fn find_app(&self, app_id: &str) -> Result<Option<App>, StoreError>;
    fn save_app(&self, app: &App) -> Result<(), StoreError>;
}

pub trait StudyRepository {
    fn find_study(&self, study_id: &str) -> Result<Option<Study>, StoreError>;
    fn save_study(&self, study: &Study) -> Result<(), StoreError>;
    fn search_studies(&self, search: &StudySearch) -> Result<Vec<Study>, StoreError>;
}

pub trait SiteRepository {
    fn find_site(&self, site_id: &str) -> Result<Option<Site>, StoreError>;
    fn save_site(&self, site: &Site) -> Result<(), StoreError>;
    /// Sites of a study, oldest first.
    fn find_sites_by_study(&self, study_id: &str) -> Result<Vec<Site>, StoreError>;
}

pub trait PermissionRepository {
    fn site_permissions_for_user(&self, user_id: &str) -> Result<Vec<SitePermission>, StoreError>;
    fn study_permissions_for_user(&self, user_id: &str)
    -> Result<Vec<StudyPermission>, StoreError>;
    fn save_site_permission(&self, permission: &SitePermission) -> Result<(), StoreError>;
    fn save_study_permission(&self, permission: &StudyPermission) -> Result<(), StoreError>;
}

pub trait LocationRepository {
    fn find_location(&self, location_id: &str) -> Result<Option<Location>, StoreError>;
    fn find_location_by_custom_id(&self, custom_id: &str) -> Result<Option<Location>, StoreError>;
    fn save_location(&self, location: &Location) -> Result<(), StoreError>;
    /// Newest first; `search_term` matches custom id or name.
    fn search_locations(
        &self,
        search_term: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Location>, StoreError>;
}

pub trait ParticipantRepository {
    fn registry_for_sites(
        &self,
        site_ids: &[String],
    ) -> Result<Vec<ParticipantRegistrySite>, StoreError>;
    fn participant_studies_for_sites(
        &self,
        site_ids: &[String],
    ) -> Result<Vec<ParticipantStudy>, StoreError>;
    /// Participant studies joined to the given registry entries, whatever their site.
    fn participant_studies_for_registry(
        &self,
        registry_ids: &[String],
    ) -> Result<Vec<ParticipantStudy>, StoreError>;
    fn save_registry_entry(&self, entry: &ParticipantRegistrySite) -> Result<(), StoreError>;
    fn save_participant_study(&self, participant: &ParticipantStudy) -> Result<(), StoreError>;
}

pub trait Store:
    UserRepository
    + AppRepository
    + StudyRepository
    + SiteRepository
    + PermissionRepository
    + LocationRepository
    + ParticipantRepository
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: UserRepository
        + AppRepository
        + StudyRepository
        + SiteRepository
        + PermissionRepository
        + LocationRepository
        + ParticipantRepository
        + Send
        + Sync
{
}

/// Exposes the admin users of a [`Store`] to the active user filter.
#[derive(Clone)]
pub struct AdminUsers(pub Arc<dyn Store>);

impl UserLookup for AdminUsers {
    fn find_user_status(&self, user_id: &str) -> Result<Option<UserStatus>, LookupError> {
        let user = self
            .0
            .find_user(user_id)
            .map_err(|err| LookupError(err.to_string()))?;

        Ok(user.map(|user| UserStatus {
            active: user.active,
            super_admin: user.super_admin,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enrollment_status_accepts_legacy_display_value() {
        assert_eq!(
            EnrollmentStatus::from_code("Enrolled"),
            Some(EnrollmentStatus::Enrolled)
        );
        assert_eq!(EnrollmentStatus::Enrolled.code(), "inProgress");
    }

    #[test]
    fn onboarding_codes_round_trip() {
        for status in [
            OnboardingStatus::New,
            OnboardingStatus::Invited,
            OnboardingStatus::Enrolled,
            OnboardingStatus::Disabled,
        ] {
            assert_eq!(OnboardingStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn admin_users_report_status() {
        let store = InMemoryStore::new();
        store
            .save_user(&AdminUser {
                id: "u1".to_string(),
                email: "admin@example.org".to_string(),
                first_name: None,
                last_name: None,
                active: false,
                super_admin: true,
                location_permission: None,
            })
            .unwrap();

        let lookup = AdminUsers(Arc::new(store));
        assert_eq!(
            lookup.find_user_status("u1").unwrap(),
            Some(UserStatus {
                active: false,
                super_admin: true
            })
        );
        assert_eq!(lookup.find_user_status("u2").unwrap(), None);
    }
}
