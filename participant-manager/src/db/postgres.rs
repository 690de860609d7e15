use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;

use common::PageRequest;

use super::schema::*;
use super::{
    AdminUser, App, AppRepository, EnrollmentStatus, Location, LocationRepository, LocationStatus,
    OnboardingStatus, ParticipantRegistrySite, ParticipantRepository, ParticipantStudy,
    Permission, PermissionRepository, Site, SitePermission, SiteRepository, SiteStatus,
    StoreError, Study, StudyPermission, StudyRepository, StudySearch, StudyType, UserRepository,
};

const ACTIVE_USER_STATUS: i32 = 1;
const DEACTIVATED_USER_STATUS: i32 = 0;

/// PostgreSQL backed store, one connection per operation.
pub struct PgStore {
    database_url: String,
}

impl PgStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        PgStore {
            database_url: database_url.into(),
        }
    }

    fn connection(&self) -> Result<PgConnection, StoreError> {
        Ok(PgConnection::establish(&self.database_url)?)
    }
}

fn corrupt(column: &'static str, value: impl ToString) -> StoreError {
    StoreError::Corrupt {
        column,
        value: value.to_string(),
    }
}

/// `%term%` for ILIKE, with the wildcards inside `term` matched literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn unique_violation(err: diesel::result::Error) -> StoreError {
    match err {
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::Conflict(info.constraint_name().unwrap_or("unique").to_string())
        }
        other => StoreError::Query(other),
    }
}

fn permission(column: &'static str, value: i32) -> Result<Permission, StoreError> {
    Permission::from_value(value).ok_or_else(|| corrupt(column, value))
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = ur_admin_user)]
#[diesel(treat_none_as_null = true)]
struct AdminUserRow {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    status: i32,
    super_admin: bool,
    location_permission: Option<i32>,
}

impl TryFrom<AdminUserRow> for AdminUser {
    type Error = StoreError;

    fn try_from(row: AdminUserRow) -> Result<Self, StoreError> {
        let location_permission = row
            .location_permission
            .map(|value| permission("ur_admin_user.location_permission", value))
            .transpose()?;

        Ok(AdminUser {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            active: row.status == ACTIVE_USER_STATUS,
            super_admin: row.super_admin,
            location_permission,
        })
    }
}

impl From<&AdminUser> for AdminUserRow {
    fn from(user: &AdminUser) -> Self {
        AdminUserRow {
            id: user.id.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            status: if user.active {
                ACTIVE_USER_STATUS
            } else {
                DEACTIVATED_USER_STATUS
            },
            super_admin: user.super_admin,
            location_permission: user.location_permission.map(|p| p.value()),
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = app_info)]
struct AppRow {
    id: String,
    custom_app_id: String,
    app_name: String,
}

impl From<AppRow> for App {
    fn from(row: AppRow) -> Self {
        App {
            id: row.id,
            custom_id: row.custom_app_id,
            name: row.app_name,
        }
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = study_info)]
#[diesel(treat_none_as_null = true)]
struct StudyRow {
    id: String,
    custom_id: String,
    name: String,
    app_info_id: Option<String>,
    study_type: String,
    created_time: DateTime<Utc>,
}

impl TryFrom<StudyRow> for Study {
    type Error = StoreError;

    fn try_from(row: StudyRow) -> Result<Self, StoreError> {
        let study_type = StudyType::from_code(&row.study_type)
            .ok_or_else(|| corrupt("study_info.study_type", &row.study_type))?;

        Ok(Study {
            id: row.id,
            custom_id: row.custom_id,
            name: row.name,
            app_id: row.app_info_id,
            study_type,
            created_at: row.created_time,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = locations)]
#[diesel(treat_none_as_null = true)]
struct LocationRow {
    id: String,
    custom_id: String,
    name: String,
    description: Option<String>,
    status: i32,
    created_by: Option<String>,
    created_time: DateTime<Utc>,
}

impl TryFrom<LocationRow> for Location {
    type Error = StoreError;

    fn try_from(row: LocationRow) -> Result<Self, StoreError> {
        let status = LocationStatus::from_value(row.status)
            .ok_or_else(|| corrupt("locations.status", row.status))?;

        Ok(Location {
            id: row.id,
            custom_id: row.custom_id,
            name: row.name,
            description: row.description,
            status,
            created_by: row.created_by,
            created_at: row.created_time,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = sites)]
#[diesel(treat_none_as_null = true)]
struct SiteRow {
    id: String,
    study_id: String,
    location_id: Option<String>,
    status: i32,
    target_enrollment: Option<i32>,
    created_time: DateTime<Utc>,
}

impl TryFrom<SiteRow> for Site {
    type Error = StoreError;

    fn try_from(row: SiteRow) -> Result<Self, StoreError> {
        let status =
            SiteStatus::from_value(row.status).ok_or_else(|| corrupt("sites.status", row.status))?;

        Ok(Site {
            id: row.id,
            study_id: row.study_id,
            location_id: row.location_id,
            status,
            target_enrollment: row.target_enrollment,
            created_at: row.created_time,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = sites_permissions)]
#[diesel(treat_none_as_null = true)]
struct SitePermissionRow {
    id: String,
    ur_admin_user_id: String,
    site_id: String,
    study_id: String,
    app_info_id: Option<String>,
    edit: i32,
}

impl TryFrom<SitePermissionRow> for SitePermission {
    type Error = StoreError;

    fn try_from(row: SitePermissionRow) -> Result<Self, StoreError> {
        Ok(SitePermission {
            edit: permission("sites_permissions.edit", row.edit)?,
            id: row.id,
            user_id: row.ur_admin_user_id,
            site_id: row.site_id,
            study_id: row.study_id,
            app_id: row.app_info_id,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = study_permissions)]
#[diesel(treat_none_as_null = true)]
struct StudyPermissionRow {
    id: String,
    ur_admin_user_id: String,
    study_id: String,
    app_info_id: Option<String>,
    edit: i32,
}

impl TryFrom<StudyPermissionRow> for StudyPermission {
    type Error = StoreError;

    fn try_from(row: StudyPermissionRow) -> Result<Self, StoreError> {
        Ok(StudyPermission {
            edit: permission("study_permissions.edit", row.edit)?,
            id: row.id,
            user_id: row.ur_admin_user_id,
            study_id: row.study_id,
            app_id: row.app_info_id,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = participant_registry_site)]
#[diesel(treat_none_as_null = true)]
struct RegistryRow {
    id: String,
    site_id: String,
    study_info_id: String,
    email: String,
    onboarding_status: String,
    invitation_time: Option<DateTime<Utc>>,
    created_time: DateTime<Utc>,
}

impl TryFrom<RegistryRow> for ParticipantRegistrySite {
    type Error = StoreError;

    fn try_from(row: RegistryRow) -> Result<Self, StoreError> {
        let onboarding_status = OnboardingStatus::from_code(&row.onboarding_status).ok_or_else(
            || corrupt("participant_registry_site.onboarding_status", &row.onboarding_status),
        )?;

        Ok(ParticipantRegistrySite {
            id: row.id,
            site_id: row.site_id,
            study_id: row.study_info_id,
            email: row.email,
            onboarding_status,
            invitation_date: row.invitation_time,
            created_at: row.created_time,
        })
    }
}

#[derive(Debug, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = participant_study_info)]
#[diesel(treat_none_as_null = true)]
struct ParticipantStudyRow {
    id: String,
    participant_registry_site_id: Option<String>,
    study_info_id: String,
    site_id: Option<String>,
    participant_id: Option<String>,
    status: String,
    enrolled_time: Option<DateTime<Utc>>,
    withdrawal_time: Option<DateTime<Utc>>,
}

impl TryFrom<ParticipantStudyRow> for ParticipantStudy {
    type Error = StoreError;

    fn try_from(row: ParticipantStudyRow) -> Result<Self, StoreError> {
        let status = EnrollmentStatus::from_code(&row.status)
            .ok_or_else(|| corrupt("participant_study_info.status", &row.status))?;

        Ok(ParticipantStudy {
            id: row.id,
            participant_registry_site_id: row.participant_registry_site_id,
            study_id: row.study_info_id,
            site_id: row.site_id,
            participant_id: row.participant_id,
            status,
            enrolled_date: row.enrolled_time,
            withdrawal_date: row.withdrawal_time,
        })
    }
}

impl UserRepository for PgStore {
    fn find_user(&self, user_id: &str) -> Result<Option<AdminUser>, StoreError> {
        let mut conn = self.connection()?;

        ur_admin_user::table
            .find(user_id)
            .select(AdminUserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(AdminUser::try_from)
            .transpose()
    }

    fn save_user(&self, user: &AdminUser) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = AdminUserRow::from(user);

        diesel::insert_into(ur_admin_user::table)
            .values(&row)
            .on_conflict(ur_admin_user::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}

impl AppRepository for PgStore {
    fn find_app(&self, app_id: &str) -> Result<Option<App>, StoreError> {
        let mut conn = self.connection()?;

        let row = app_info::table
            .find(app_id)
            .select(AppRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(App::from))
    }

    fn save_app(&self, app: &App) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = AppRow {
            id: app.id.clone(),
            custom_app_id: app.custom_id.clone(),
            app_name: app.name.clone(),
        };

        diesel::insert_into(app_info::table)
            .values(&row)
            .on_conflict(app_info::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}

impl StudyRepository for PgStore {
    fn find_study(&self, study_id: &str) -> Result<Option<Study>, StoreError> {
        let mut conn = self.connection()?;

        study_info::table
            .find(study_id)
            .select(StudyRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Study::try_from)
            .transpose()
    }

    fn save_study(&self, study: &Study) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = StudyRow {
            id: study.id.clone(),
            custom_id: study.custom_id.clone(),
            name: study.name.clone(),
            app_info_id: study.app_id.clone(),
            study_type: study.study_type.code().to_string(),
            created_time: study.created_at,
        };

        diesel::insert_into(study_info::table)
            .values(&row)
            .on_conflict(study_info::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn search_studies(&self, search: &StudySearch) -> Result<Vec<Study>, StoreError> {
        let mut conn = self.connection()?;

        let mut query = study_info::table.into_boxed();
        if let Some(ids) = &search.study_ids {
            query = query.filter(study_info::id.eq_any(ids.clone()));
        }
        if let Some(term) = &search.search_term {
            let pattern = contains_pattern(term);
            query = query.filter(
                study_info::custom_id
                    .ilike(pattern.clone())
                    .escape('\\')
                    .or(study_info::name.ilike(pattern).escape('\\')),
            );
        }
        query = query
            .order(study_info::created_time.desc())
            .offset(i64::from(search.page.offset.unwrap_or(0)));
        if let Some(limit) = search.page.limit {
            query = query.limit(i64::from(limit));
        }

        query
            .select(StudyRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(Study::try_from)
            .collect()
    }
}

impl SiteRepository for PgStore {
    fn find_site(&self, site_id: &str) -> Result<Option<Site>, StoreError> {
        let mut conn = self.connection()?;

        sites::table
            .find(site_id)
            .select(SiteRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Site::try_from)
            .transpose()
    }

    fn save_site(&self, site: &Site) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = SiteRow {
            id: site.id.clone(),
            study_id: site.study_id.clone(),
            location_id: site.location_id.clone(),
            status: site.status.value(),
            target_enrollment: site.target_enrollment,
            created_time: site.created_at,
        };

        diesel::insert_into(sites::table)
            .values(&row)
            .on_conflict(sites::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_sites_by_study(&self, study_id: &str) -> Result<Vec<Site>, StoreError> {
        let mut conn = self.connection()?;

        sites::table
            .filter(sites::study_id.eq(study_id))
            .order(sites::created_time.asc())
            .select(SiteRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(Site::try_from)
            .collect()
    }
}

impl PermissionRepository for PgStore {
    fn site_permissions_for_user(&self, user_id: &str) -> Result<Vec<SitePermission>, StoreError> {
        let mut conn = self.connection()?;

        sites_permissions::table
            .filter(sites_permissions::ur_admin_user_id.eq(user_id))
            .select(SitePermissionRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(SitePermission::try_from)
            .collect()
    }

    fn study_permissions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<StudyPermission>, StoreError> {
        let mut conn = self.connection()?;

        study_permissions::table
            .filter(study_permissions::ur_admin_user_id.eq(user_id))
            .select(StudyPermissionRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(StudyPermission::try_from)
            .collect()
    }

    fn save_site_permission(&self, permission: &SitePermission) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = SitePermissionRow {
            id: permission.id.clone(),
            ur_admin_user_id: permission.user_id.clone(),
            site_id: permission.site_id.clone(),
            study_id: permission.study_id.clone(),
            app_info_id: permission.app_id.clone(),
            edit: permission.edit.value(),
        };

        diesel::insert_into(sites_permissions::table)
            .values(&row)
            .on_conflict(sites_permissions::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn save_study_permission(&self, permission: &StudyPermission) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = StudyPermissionRow {
            id: permission.id.clone(),
            ur_admin_user_id: permission.user_id.clone(),
            study_id: permission.study_id.clone(),
            app_info_id: permission.app_id.clone(),
            edit: permission.edit.value(),
        };

        diesel::insert_into(study_permissions::table)
            .values(&row)
            .on_conflict(study_permissions::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}

impl LocationRepository for PgStore {
    fn find_location(&self, location_id: &str) -> Result<Option<Location>, StoreError> {
        let mut conn = self.connection()?;

        locations::table
            .find(location_id)
            .select(LocationRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Location::try_from)
            .transpose()
    }

    fn find_location_by_custom_id(&self, custom_id: &str) -> Result<Option<Location>, StoreError> {
        let mut conn = self.connection()?;

        locations::table
            .filter(locations::custom_id.eq(custom_id))
            .select(LocationRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Location::try_from)
            .transpose()
    }

    fn save_location(&self, location: &Location) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = LocationRow {
            id: location.id.clone(),
            custom_id: location.custom_id.clone(),
            name: location.name.clone(),
            description: location.description.clone(),
            status: location.status.value(),
            created_by: location.created_by.clone(),
            created_time: location.created_at,
        };

        diesel::insert_into(locations::table)
            .values(&row)
            .on_conflict(locations::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)
            .map_err(unique_violation)?;
        Ok(())
    }

    fn search_locations(
        &self,
        search_term: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Location>, StoreError> {
        let mut conn = self.connection()?;

        let mut query = locations::table.into_boxed();
        if let Some(term) = search_term {
            let pattern = contains_pattern(term);
            query = query.filter(
                locations::custom_id
                    .ilike(pattern.clone())
                    .escape('\\')
                    .or(locations::name.ilike(pattern).escape('\\')),
            );
        }
        query = query
            .order(locations::created_time.desc())
            .offset(i64::from(page.offset.unwrap_or(0)));
        if let Some(limit) = page.limit {
            query = query.limit(i64::from(limit));
        }

        query
            .select(LocationRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(Location::try_from)
            .collect()
    }
}

impl ParticipantRepository for PgStore {
    fn registry_for_sites(
        &self,
        site_ids: &[String],
    ) -> Result<Vec<ParticipantRegistrySite>, StoreError> {
        let mut conn = self.connection()?;

        participant_registry_site::table
            .filter(participant_registry_site::site_id.eq_any(site_ids))
            .order(participant_registry_site::created_time.asc())
            .select(RegistryRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(ParticipantRegistrySite::try_from)
            .collect()
    }

    fn participant_studies_for_sites(
        &self,
        site_ids: &[String],
    ) -> Result<Vec<ParticipantStudy>, StoreError> {
        let mut conn = self.connection()?;

        participant_study_info::table
            .filter(participant_study_info::site_id.eq_any(site_ids))
            .select(ParticipantStudyRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(ParticipantStudy::try_from)
            .collect()
    }

    fn participant_studies_for_registry(
        &self,
        registry_ids: &[String],
    ) -> Result<Vec<ParticipantStudy>, StoreError> {
        let mut conn = self.connection()?;

        participant_study_info::table
            .filter(participant_study_info::participant_registry_site_id.eq_any(registry_ids))
            .select(ParticipantStudyRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(ParticipantStudy::try_from)
            .collect()
    }

    fn save_registry_entry(&self, entry: &ParticipantRegistrySite) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = RegistryRow {
            id: entry.id.clone(),
            site_id: entry.site_id.clone(),
            study_info_id: entry.study_id.clone(),
            email: entry.email.clone(),
            onboarding_status: entry.onboarding_status.code().to_string(),
            invitation_time: entry.invitation_date,
            created_time: entry.created_at,
        };

        diesel::insert_into(participant_registry_site::table)
            .values(&row)
            .on_conflict(participant_registry_site::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn save_participant_study(&self, participant: &ParticipantStudy) -> Result<(), StoreError> {
        let mut conn = self.connection()?;
        let row = ParticipantStudyRow {
            id: participant.id.clone(),
            participant_registry_site_id: participant.participant_registry_site_id.clone(),
            study_info_id: participant.study_id.clone(),
            site_id: participant.site_id.clone(),
            participant_id: participant.participant_id.clone(),
            status: participant.status.code().to_string(),
            enrolled_time: participant.enrolled_date,
            withdrawal_time: participant.withdrawal_date,
        };

        diesel::insert_into(participant_study_info::table)
            .values(&row)
            .on_conflict(participant_study_info::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;
        Ok(())
    }
}
