use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use common::PageRequest;

use super::{
    AdminUser, App, AppRepository, Location, LocationRepository, ParticipantRegistrySite,
    ParticipantRepository, ParticipantStudy, PermissionRepository, Site, SitePermission,
    SiteRepository, StoreError, Study, StudyPermission, StudyRepository, StudySearch,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, AdminUser>,
    apps: HashMap<String, App>,
    studies: HashMap<String, Study>,
    sites: HashMap<String, Site>,
    locations: HashMap<String, Location>,
    site_permissions: HashMap<String, SitePermission>,
    study_permissions: HashMap<String, StudyPermission>,
    registry: HashMap<String, ParticipantRegistrySite>,
    participant_studies: HashMap<String, ParticipantStudy>,
}

/// Store kept in process memory, used by tests and local runs.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    unavailable: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// A store whose every operation fails.
    pub fn unavailable() -> Self {
        InMemoryStore {
            tables: RwLock::default(),
            unavailable: true,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

fn contains_ignore_case(value: &str, term: &str) -> bool {
    value.to_lowercase().contains(&term.to_lowercase())
}

impl UserRepository for InMemoryStore {
    fn find_user(&self, user_id: &str) -> Result<Option<AdminUser>, StoreError> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    fn save_user(&self, user: &AdminUser) -> Result<(), StoreError> {
        self.write()?.users.insert(user.id.clone(), user.clone());
        Ok(())
    }
}

impl AppRepository for InMemoryStore {
    fn find_app(&self, app_id: &str) -> Result<Option<App>, StoreError> {
        Ok(self.read()?.apps.get(app_id).cloned())
    }

    fn save_app(&self, app: &App) -> Result<(), StoreError> {
        self.write()?.apps.insert(app.id.clone(), app.clone());
        Ok(())
    }
}

impl StudyRepository for InMemoryStore {
    fn find_study(&self, study_id: &str) -> Result<Option<Study>, StoreError> {
        Ok(self.read()?.studies.get(study_id).cloned())
    }

    fn save_study(&self, study: &Study) -> Result<(), StoreError> {
        self.write()?.studies.insert(study.id.clone(), study.clone());
        Ok(())
    }

    fn search_studies(&self, search: &StudySearch) -> Result<Vec<Study>, StoreError> {
        let tables = self.read()?;

        let mut studies: Vec<Study> = tables
            .studies
            .values()
            .filter(|study| match &search.study_ids {
                Some(ids) => ids.contains(&study.id),
                None => true,
            })
            .filter(|study| match &search.search_term {
                Some(term) => {
                    contains_ignore_case(&study.custom_id, term)
                        || contains_ignore_case(&study.name, term)
                }
                None => true,
            })
            .cloned()
            .collect();
        studies.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(search.page.apply(studies))
    }
}

impl SiteRepository for InMemoryStore {
    fn find_site(&self, site_id: &str) -> Result<Option<Site>, StoreError> {
        Ok(self.read()?.sites.get(site_id).cloned())
    }

    fn save_site(&self, site: &Site) -> Result<(), StoreError> {
        self.write()?.sites.insert(site.id.clone(), site.clone());
        Ok(())
    }

    fn find_sites_by_study(&self, study_id: &str) -> Result<Vec<Site>, StoreError> {
        let mut sites: Vec<Site> = self
            .read()?
            .sites
            .values()
            .filter(|site| site.study_id == study_id)
            .cloned()
            .collect();
        sites.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(sites)
    }
}

impl PermissionRepository for InMemoryStore {
    fn site_permissions_for_user(&self, user_id: &str) -> Result<Vec<SitePermission>, StoreError> {
        Ok(self
            .read()?
            .site_permissions
            .values()
            .filter(|permission| permission.user_id == user_id)
            .cloned()
            .collect())
    }

    fn study_permissions_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<StudyPermission>, StoreError> {
        Ok(self
            .read()?
            .study_permissions
            .values()
            .filter(|permission| permission.user_id == user_id)
            .cloned()
            .collect())
    }

    fn save_site_permission(&self, permission: &SitePermission) -> Result<(), StoreError> {
        self.write()?
            .site_permissions
            .insert(permission.id.clone(), permission.clone());
        Ok(())
    }

    fn save_study_permission(&self, permission: &StudyPermission) -> Result<(), StoreError> {
        self.write()?
            .study_permissions
            .insert(permission.id.clone(), permission.clone());
        Ok(())
    }
}

impl LocationRepository for InMemoryStore {
    fn find_location(&self, location_id: &str) -> Result<Option<Location>, StoreError> {
        Ok(self.read()?.locations.get(location_id).cloned())
    }

    fn find_location_by_custom_id(&self, custom_id: &str) -> Result<Option<Location>, StoreError> {
        Ok(self
            .read()?
            .locations
            .values()
            .find(|location| location.custom_id == custom_id)
            .cloned())
    }

    fn save_location(&self, location: &Location) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables
            .locations
            .values()
            .any(|existing| existing.custom_id == location.custom_id && existing.id != location.id)
        {
            return Err(StoreError::Conflict("locations_custom_id_key".to_string()));
        }
        tables.locations.insert(location.id.clone(), location.clone());
        Ok(())
    }

    fn search_locations(
        &self,
        search_term: Option<&str>,
        page: PageRequest,
    ) -> Result<Vec<Location>, StoreError> {
        let mut locations: Vec<Location> = self
            .read()?
            .locations
            .values()
            .filter(|location| match search_term {
                Some(term) => {
                    contains_ignore_case(&location.custom_id, term)
                        || contains_ignore_case(&location.name, term)
                }
                None => true,
            })
            .cloned()
            .collect();
        locations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(page.apply(locations))
    }
}

impl ParticipantRepository for InMemoryStore {
    fn registry_for_sites(
        &self,
        site_ids: &[String],
    ) -> Result<Vec<ParticipantRegistrySite>, StoreError> {
        let mut entries: Vec<ParticipantRegistrySite> = self
            .read()?
            .registry
            .values()
            .filter(|entry| site_ids.contains(&entry.site_id))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(entries)
    }

    fn participant_studies_for_sites(
        &self,
        site_ids: &[String],
    ) -> Result<Vec<ParticipantStudy>, StoreError> {
        Ok(self
            .read()?
            .participant_studies
            .values()
            .filter(|participant| {
                participant
                    .site_id
                    .as_ref()
                    .is_some_and(|site_id| site_ids.contains(site_id))
            })
            .cloned()
            .collect())
    }

    fn participant_studies_for_registry(
        &self,
        registry_ids: &[String],
    ) -> Result<Vec<ParticipantStudy>, StoreError> {
        Ok(self
            .read()?
            .participant_studies
            .values()
            .filter(|participant| {
                participant
                    .participant_registry_site_id
                    .as_ref()
                    .is_some_and(|registry_id| registry_ids.contains(registry_id))
            })
            .cloned()
            .collect())
    }

    fn save_registry_entry(&self, entry: &ParticipantRegistrySite) -> Result<(), StoreError> {
        self.write()?
            .registry
            .insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    fn save_participant_study(&self, participant: &ParticipantStudy) -> Result<(), StoreError> {
        self.write()?
            .participant_studies
            .insert(participant.id.clone(), participant.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::db::{EnrollmentStatus, LocationStatus, StudyType};

    fn study(id: &str, name: &str, age_minutes: i64) -> Study {
        Study {
            id: id.to_string(),
            custom_id: id.to_uppercase(),
            name: name.to_string(),
            app_id: None,
            study_type: StudyType::Close,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn studies_are_listed_newest_first() {
        let store = InMemoryStore::new();
        store.save_study(&study("s1", "Older", 10)).unwrap();
        store.save_study(&study("s2", "Newer", 1)).unwrap();

        let found = store.search_studies(&StudySearch::default()).unwrap();
        let ids: Vec<&str> = found.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
    }

    #[test]
    fn study_search_restricts_ids_and_matches_name() {
        let store = InMemoryStore::new();
        store.save_study(&study("s1", "Heart Health", 10)).unwrap();
        store.save_study(&study("s2", "Sleep", 5)).unwrap();
        store.save_study(&study("s3", "heartbeat", 1)).unwrap();

        let found = store
            .search_studies(&StudySearch {
                study_ids: Some(vec!["s1".to_string(), "s2".to_string()]),
                search_term: Some("HEART".to_string()),
                page: PageRequest::default(),
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "s1");
    }

    fn location(id: &str, custom_id: &str, name: &str) -> Location {
        Location {
            id: id.to_string(),
            custom_id: custom_id.to_string(),
            name: name.to_string(),
            description: None,
            status: LocationStatus::Active,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn wildcard_characters_in_search_are_literal() {
        let store = InMemoryStore::new();
        store.save_study(&study("s1", "Heart_Health", 10)).unwrap();
        store.save_study(&study("s2", "Sleep", 5)).unwrap();
        store.save_location(&location("l1", "BOS", "Boston")).unwrap();
        store.save_location(&location("l2", "NYC_2", "New York")).unwrap();

        let found = store
            .search_studies(&StudySearch {
                search_term: Some("_".to_string()),
                ..StudySearch::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "s1");

        let found = store.search_locations(Some("_"), PageRequest::default()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "l2");
        assert!(store
            .search_locations(Some("%"), PageRequest::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn custom_location_id_is_unique() {
        let store = InMemoryStore::new();
        store.save_location(&location("l1", "BOS", "Boston")).unwrap();

        assert!(matches!(
            store.save_location(&location("l2", "BOS", "Boston annex")),
            Err(StoreError::Conflict(_))
        ));
        store.save_location(&location("l1", "BOS", "Boston General")).unwrap();
        assert_eq!(store.find_location("l1").unwrap().unwrap().name, "Boston General");
        assert!(store.find_location("l2").unwrap().is_none());
    }

    #[test]
    fn participant_studies_join_registry_without_a_site() {
        let store = InMemoryStore::new();
        store
            .save_participant_study(&ParticipantStudy {
                id: "ps1".to_string(),
                participant_registry_site_id: Some("r1".to_string()),
                study_id: "s1".to_string(),
                site_id: None,
                participant_id: None,
                status: EnrollmentStatus::Enrolled,
                enrolled_date: None,
                withdrawal_date: None,
            })
            .unwrap();

        assert!(store.participant_studies_for_sites(&["site-1".to_string()]).unwrap().is_empty());
        let found = store.participant_studies_for_registry(&["r1".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "ps1");
    }

    #[test]
    fn unavailable_store_fails() {
        let store = InMemoryStore::unavailable();
        assert!(matches!(
            store.find_user("u1"),
            Err(StoreError::Unavailable(_))
        ));
    }
}
