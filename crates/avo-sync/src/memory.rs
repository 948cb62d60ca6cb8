//! In-memory collection backend.
//!
//! Stores collections in a map, assigns fragment ids from a counter, and
//! records every call so tests (and `avo update --dry-run`) can see exactly
//! which writes a save would perform. Timestamps are stored at microsecond
//! precision, as the database does.
//!
//! ## Usage
//!
//! ```rust
//! use avo_core::{Collection, ContentType};
//! use avo_sync::memory::InMemoryBackend;
//! use uuid::Uuid;
//!
//! let collection = Collection::new("Klimaat", ContentType::Collection, Uuid::new_v4());
//! let backend = InMemoryBackend::new()
//!     .with_collection(collection)
//!     .with_next_fragment_id(101);
//! assert!(backend.calls().is_empty());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use uuid::Uuid;

use avo_core::{
    Collection, CollectionInsert, CollectionManagement, CollectionPatch, CollectionRepository,
    ContentType, EditLock, EditLockProvider, Error, Fragment, FragmentId, FragmentInsert,
    FragmentPatch, FragmentRepository, ItemResolver, LabelRepository, ManagementFields,
    ManagementRepository, QualityCheckEntry, QualityLabel, Result,
};

/// How long an in-memory edit lock stays valid.
const LOCK_TTL_MINUTES: i64 = 15;

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendCall {
    pub operation: &'static str,
    pub detail: String,
}

impl BackendCall {
    /// Whether this call changes stored state.
    pub fn is_write(&self) -> bool {
        !matches!(
            self.operation,
            "fetch"
                | "fetch_updated_at"
                | "titles_for_owner"
                | "list_quality_labels"
                | "thumbnail_for_item"
        )
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryConfig {
    quality_labels: Vec<QualityLabel>,
    item_thumbnails: HashMap<String, String>,
    failing: HashSet<&'static str>,
    short_insert_response: bool,
    session_profile: Uuid,
    session_name: Option<String>,
}

#[derive(Debug)]
struct Store {
    collections: HashMap<Uuid, Collection>,
    locks: HashMap<Uuid, EditLock>,
    next_fragment_id: i64,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            locks: HashMap::new(),
            next_fragment_id: 1,
        }
    }
}

/// Backend keeping everything in process memory.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    config: Arc<MemoryConfig>,
    store: Arc<Mutex<Store>>,
    call_log: Arc<Mutex<Vec<BackendCall>>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a stored collection.
    pub fn with_collection(self, collection: Collection) -> Self {
        {
            let mut store = guard(&self.store);
            let highest = collection
                .fragments
                .iter()
                .filter_map(|f| f.id.saved())
                .max()
                .unwrap_or(0);
            if highest >= store.next_fragment_id {
                store.next_fragment_id = highest + 1;
            }
            store.collections.insert(collection.id, collection);
        }
        self
    }

    /// The id the next inserted fragment receives.
    pub fn with_next_fragment_id(self, id: i64) -> Self {
        guard(&self.store).next_fragment_id = id;
        self
    }

    pub fn with_quality_labels(mut self, labels: Vec<QualityLabel>) -> Self {
        Arc::make_mut(&mut self.config).quality_labels = labels;
        self
    }

    pub fn with_item_thumbnail(
        mut self,
        external_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .item_thumbnails
            .insert(external_id.into(), path.into());
        self
    }

    /// Make every call to `operation` fail with a request error.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        Arc::make_mut(&mut self.config).failing.insert(operation);
        self
    }

    /// Return one id fewer than requested from `insert_fragments`.
    pub fn with_short_insert_response(mut self) -> Self {
        Arc::make_mut(&mut self.config).short_insert_response = true;
        self
    }

    /// Profile that acquires edit locks through this backend.
    pub fn with_session(mut self, profile_id: Uuid, name: Option<&str>) -> Self {
        let config = Arc::make_mut(&mut self.config);
        config.session_profile = profile_id;
        config.session_name = name.map(str::to_string);
        self
    }

    /// Seed an edit lock held by someone else.
    pub fn with_lock(self, lock: EditLock) -> Self {
        guard(&self.store).locks.insert(lock.collection_id, lock);
        self
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<BackendCall> {
        guard(&self.call_log).clone()
    }

    /// Logged calls that change stored state.
    pub fn writes(&self) -> Vec<BackendCall> {
        self.calls().into_iter().filter(BackendCall::is_write).collect()
    }

    /// Number of logged calls to `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        guard(&self.call_log)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        guard(&self.call_log).clear()
    }

    /// The stored state of a collection, without logging a call.
    pub fn snapshot(&self, id: Uuid) -> Option<Collection> {
        guard(&self.store).collections.get(&id).map(sorted)
    }

    fn log_call(&self, operation: &'static str, detail: impl Into<String>) -> Result<()> {
        guard(&self.call_log).push(BackendCall {
            operation,
            detail: detail.into(),
        });
        if self.config.failing.contains(operation) {
            return Err(Error::Request(format!("{}: simulated failure", operation)));
        }
        Ok(())
    }
}

fn as_stored(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

fn sorted(collection: &Collection) -> Collection {
    let mut copy = collection.clone();
    copy.fragments.sort_by_key(|f| f.position);
    copy
}

fn fragment_from_insert(id: i64, insert: FragmentInsert) -> Fragment {
    Fragment {
        id: FragmentId::Saved(id),
        position: insert.position,
        kind: insert.kind,
        external_id: insert.external_id,
        use_custom_fields: insert.use_custom_fields,
        custom_title: insert.custom_title,
        custom_description: insert.custom_description,
        start_oc: insert.start_oc,
        end_oc: insert.end_oc,
        item_meta: None,
    }
}

fn apply_fragment_patch(fragment: &mut Fragment, patch: FragmentPatch) {
    fragment.position = patch.position;
    fragment.external_id = patch.external_id;
    fragment.use_custom_fields = patch.use_custom_fields;
    fragment.custom_title = patch.custom_title;
    fragment.custom_description = patch.custom_description;
    fragment.start_oc = patch.start_oc;
    fragment.end_oc = patch.end_oc;
}

fn apply_management_fields(management: &mut CollectionManagement, fields: ManagementFields) {
    management.current_status = fields.current_status;
    management.manager_profile_id = fields.manager_profile_id;
    management.status_valid_until = fields.status_valid_until;
    management.note = fields.note;
}

#[async_trait]
impl FragmentRepository for InMemoryBackend {
    async fn insert_fragments(&self, fragments: Vec<FragmentInsert>) -> Result<Vec<i64>> {
        self.log_call("insert_fragments", format!("{} fragments", fragments.len()))?;

        let mut store = guard(&self.store);
        let mut ids = Vec::with_capacity(fragments.len());
        for insert in fragments {
            let id = store.next_fragment_id;
            store.next_fragment_id += 1;
            let collection = store
                .collections
                .get_mut(&insert.collection_uuid)
                .ok_or_else(|| {
                    Error::NotFound(format!("collection {}", insert.collection_uuid))
                })?;
            collection.fragments.push(fragment_from_insert(id, insert));
            ids.push(id);
        }

        if self.config.short_insert_response {
            ids.pop();
        }
        Ok(ids)
    }

    async fn update_fragment(&self, id: i64, patch: FragmentPatch) -> Result<u64> {
        self.log_call("update_fragment", id.to_string())?;

        let mut store = guard(&self.store);
        let target = store
            .collections
            .values_mut()
            .flat_map(|c| c.fragments.iter_mut())
            .find(|f| f.id == FragmentId::Saved(id));
        Ok(match target {
            Some(fragment) => {
                apply_fragment_patch(fragment, patch);
                1
            }
            None => 0,
        })
    }

    async fn delete_fragment(&self, id: i64) -> Result<u64> {
        self.log_call("delete_fragment", id.to_string())?;

        let mut store = guard(&self.store);
        let mut affected = 0;
        for collection in store.collections.values_mut() {
            let before = collection.fragments.len();
            collection.fragments.retain(|f| f.id != FragmentId::Saved(id));
            affected += (before - collection.fragments.len()) as u64;
        }
        Ok(affected)
    }
}

#[async_trait]
impl CollectionRepository for InMemoryBackend {
    async fn fetch(&self, id: Uuid) -> Result<Option<Collection>> {
        self.log_call("fetch", id.to_string())?;
        Ok(guard(&self.store).collections.get(&id).map(sorted))
    }

    async fn fetch_updated_at(&self, id: Uuid) -> Result<Option<DateTime<Utc>>> {
        self.log_call("fetch_updated_at", id.to_string())?;
        Ok(guard(&self.store).collections.get(&id).map(|c| c.updated_at))
    }

    async fn insert(&self, insert: CollectionInsert) -> Result<Uuid> {
        self.log_call("insert_collection", insert.id.to_string())?;

        let mut store = guard(&self.store);
        if store.collections.contains_key(&insert.id) {
            return Err(Error::InvalidInput(format!(
                "collection {} already exists",
                insert.id
            )));
        }
        let collection = Collection {
            id: insert.id,
            title: insert.title,
            description: insert.description,
            description_long: insert.description_long,
            is_public: insert.is_public,
            owner_profile_id: insert.owner_profile_id,
            created_at: as_stored(insert.created_at),
            updated_at: as_stored(insert.updated_at),
            updated_by_profile_id: insert.owner_profile_id,
            thumbnail_path: insert.thumbnail_path,
            content_type: insert.content_type,
            lom_context: insert.lom_context,
            lom_classification: insert.lom_classification,
            labels: Vec::new(),
            management: None,
            fragments: Vec::new(),
        };
        store.collections.insert(collection.id, collection);
        Ok(insert.id)
    }

    async fn update(&self, id: Uuid, patch: CollectionPatch) -> Result<u64> {
        self.log_call("update_collection", id.to_string())?;

        let mut store = guard(&self.store);
        let Some(collection) = store.collections.get_mut(&id) else {
            return Ok(0);
        };
        collection.title = patch.title;
        collection.description = patch.description;
        collection.description_long = patch.description_long;
        collection.is_public = patch.is_public;
        collection.thumbnail_path = patch.thumbnail_path;
        collection.lom_context = patch.lom_context;
        collection.lom_classification = patch.lom_classification;
        collection.updated_at = as_stored(patch.updated_at);
        collection.updated_by_profile_id = patch.updated_by_profile_id;
        Ok(1)
    }

    async fn delete(&self, id: Uuid) -> Result<u64> {
        self.log_call("delete_collection", id.to_string())?;

        let mut store = guard(&self.store);
        store.locks.remove(&id);
        Ok(store.collections.remove(&id).map_or(0, |_| 1))
    }

    async fn titles_for_owner(&self, owner: Uuid, content_type: ContentType) -> Result<Vec<String>> {
        self.log_call("titles_for_owner", owner.to_string())?;

        Ok(guard(&self.store)
            .collections
            .values()
            .filter(|c| c.owner_profile_id == Some(owner) && c.content_type == content_type)
            .map(|c| c.title.clone())
            .collect())
    }
}

#[async_trait]
impl LabelRepository for InMemoryBackend {
    async fn list_quality_labels(&self) -> Result<Vec<QualityLabel>> {
        self.log_call("list_quality_labels", "")?;
        Ok(self.config.quality_labels.clone())
    }

    async fn add_labels(&self, collection_id: Uuid, labels: &[String]) -> Result<()> {
        self.log_call("add_labels", labels.join(","))?;

        let mut store = guard(&self.store);
        let collection = store
            .collections
            .get_mut(&collection_id)
            .ok_or(Error::CollectionNotFound(collection_id))?;
        for label in labels {
            if !collection.labels.contains(label) {
                collection.labels.push(label.clone());
            }
        }
        Ok(())
    }

    async fn remove_labels(&self, collection_id: Uuid, labels: &[String]) -> Result<()> {
        self.log_call("remove_labels", labels.join(","))?;

        let mut store = guard(&self.store);
        let collection = store
            .collections
            .get_mut(&collection_id)
            .ok_or(Error::CollectionNotFound(collection_id))?;
        collection.labels.retain(|l| !labels.contains(l));
        Ok(())
    }
}

#[async_trait]
impl ManagementRepository for InMemoryBackend {
    async fn insert_management(&self, collection_id: Uuid, fields: ManagementFields) -> Result<()> {
        self.log_call("insert_management", collection_id.to_string())?;

        let mut store = guard(&self.store);
        let collection = store
            .collections
            .get_mut(&collection_id)
            .ok_or(Error::CollectionNotFound(collection_id))?;
        if collection.management.is_some() {
            return Err(Error::InvalidInput(format!(
                "management for {} already exists",
                collection_id
            )));
        }
        let mut management = CollectionManagement::default();
        apply_management_fields(&mut management, fields);
        collection.management = Some(management);
        Ok(())
    }

    async fn update_management(&self, collection_id: Uuid, fields: ManagementFields) -> Result<()> {
        self.log_call("update_management", collection_id.to_string())?;

        let mut store = guard(&self.store);
        let management = store
            .collections
            .get_mut(&collection_id)
            .and_then(|c| c.management.as_mut())
            .ok_or_else(|| Error::NotFound(format!("management for {}", collection_id)))?;
        apply_management_fields(management, fields);
        Ok(())
    }

    async fn insert_quality_check(
        &self,
        collection_id: Uuid,
        mut entry: QualityCheckEntry,
    ) -> Result<()> {
        self.log_call("insert_quality_check", format!("{:?}", entry.kind))?;

        let mut store = guard(&self.store);
        let collection = store
            .collections
            .get_mut(&collection_id)
            .ok_or(Error::CollectionNotFound(collection_id))?;
        entry.created_at.get_or_insert_with(Utc::now);
        collection
            .management
            .get_or_insert_with(CollectionManagement::default)
            .quality_checks
            .push(entry);
        Ok(())
    }
}

#[async_trait]
impl ItemResolver for InMemoryBackend {
    async fn thumbnail_for_item(&self, external_id: &str) -> Result<Option<String>> {
        self.log_call("thumbnail_for_item", external_id)?;
        Ok(self.config.item_thumbnails.get(external_id).cloned())
    }
}

#[async_trait]
impl EditLockProvider for InMemoryBackend {
    async fn acquire_edit_lock(&self, collection_id: Uuid) -> Result<EditLock> {
        self.log_call("acquire_edit_lock", collection_id.to_string())?;

        let now = Utc::now();
        let mut store = guard(&self.store);
        if let Some(held) = store.locks.get(&collection_id) {
            if held.profile_id != self.config.session_profile && held.expires_at > now {
                return Err(Error::Locked {
                    id: collection_id,
                    holder: held
                        .holder_name
                        .clone()
                        .unwrap_or_else(|| held.profile_id.to_string()),
                });
            }
        }

        let lock = EditLock {
            collection_id,
            profile_id: self.config.session_profile,
            holder_name: self.config.session_name.clone(),
            expires_at: now + Duration::minutes(LOCK_TTL_MINUTES),
        };
        store.locks.insert(collection_id, lock.clone());
        Ok(lock)
    }

    async fn release_edit_lock(&self, collection_id: Uuid) -> Result<()> {
        self.log_call("release_edit_lock", collection_id.to_string())?;

        let mut store = guard(&self.store);
        if store
            .locks
            .get(&collection_id)
            .is_some_and(|l| l.profile_id == self.config.session_profile)
        {
            store.locks.remove(&collection_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (InMemoryBackend, Uuid) {
        let mut collection = Collection::new("Klimaat", ContentType::Collection, Uuid::new_v4());
        collection.fragments = vec![Fragment::item("a").with_id(5), Fragment::item("b").with_id(7)];
        let id = collection.id;
        (InMemoryBackend::new().with_collection(collection), id)
    }

    #[tokio::test]
    async fn test_seeded_ids_advance_counter() {
        let (backend, id) = seeded();
        let ids = backend
            .insert_fragments(vec![Fragment::item("c").to_insert(id)])
            .await
            .unwrap();
        assert_eq!(ids, vec![8]);
    }

    #[tokio::test]
    async fn test_delete_and_update_report_affected_rows() {
        let (backend, _) = seeded();
        assert_eq!(backend.delete_fragment(5).await.unwrap(), 1);
        assert_eq!(backend.delete_fragment(5).await.unwrap(), 0);
        assert_eq!(
            backend
                .update_fragment(99, Fragment::item("x").to_patch())
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_update_stores_microsecond_timestamps() {
        let (backend, id) = seeded();
        let mut patch = backend.snapshot(id).unwrap().to_patch();
        patch.updated_at = "2025-03-01T12:00:00.123456789Z".parse().unwrap();

        backend.update(id, patch).await.unwrap();

        let stored = backend.fetch_updated_at(id).await.unwrap().unwrap();
        assert_eq!(stored.to_rfc3339(), "2025-03-01T12:00:00.123456+00:00");
    }

    #[tokio::test]
    async fn test_failure_injection_still_logs_call() {
        let (backend, id) = seeded();
        let backend = backend.failing_on("add_labels");
        let err = backend
            .add_labels(id, &["EXEMPLARY".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Request(_)));
        assert_eq!(backend.call_count("add_labels"), 1);
    }

    #[tokio::test]
    async fn test_reads_are_not_writes() {
        let (backend, id) = seeded();
        backend.fetch(id).await.unwrap();
        backend.fetch_updated_at(id).await.unwrap();
        assert_eq!(backend.calls().len(), 2);
        assert!(backend.writes().is_empty());
    }

    #[tokio::test]
    async fn test_lock_held_by_other_profile() {
        let (backend, id) = seeded();
        let backend = backend.with_lock(EditLock {
            collection_id: id,
            profile_id: Uuid::new_v4(),
            holder_name: Some("Meester Tom".to_string()),
            expires_at: Utc::now() + Duration::minutes(5),
        });

        match backend.acquire_edit_lock(id).await {
            Err(Error::Locked { holder, .. }) => assert_eq!(holder, "Meester Tom"),
            other => panic!("expected Locked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_expired_lock_can_be_taken_over() {
        let (backend, id) = seeded();
        let me = Uuid::new_v4();
        let backend = backend
            .with_session(me, Some("Juf Anna"))
            .with_lock(EditLock {
                collection_id: id,
                profile_id: Uuid::new_v4(),
                holder_name: None,
                expires_at: Utc::now() - Duration::minutes(1),
            });

        let lock = backend.acquire_edit_lock(id).await.unwrap();
        assert_eq!(lock.profile_id, me);
        backend.release_edit_lock(id).await.unwrap();
        assert!(backend.acquire_edit_lock(id).await.is_ok());
    }
}
