//! Collection save orchestration.
//!
//! [`CollectionService`] turns an edit (an initial and an updated snapshot
//! of one collection) into the backend writes that persist it: fragments,
//! the collection row, quality labels and management metadata.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use avo_core::logging::{
    COLLECTION_ID, COMPONENT, DELETE_COUNT, DURATION_MS, ERROR_MSG, INSERT_COUNT, OPERATION,
    PROFILE_ID, SUBSYSTEM, UPDATE_COUNT,
};
use avo_core::{
    classify, diff_labels, duplicate_for, ensure_unique_ids, ensure_valid, plan_for,
    reindex_positions, stored_now, Actor, Collection, CollectionBackend, CollectionManagement,
    ContentType, EditLockProvider, Error, Fragment, FragmentId, FragmentKind, FragmentPlan,
    LabelCatalog, LabelDiff, Permission, QualityCheckEntry, QualityCheckKind, QualityLabel,
    Result, ValidationMode,
};

use crate::synchronizer::{FragmentSynchronizer, SyncReport};

/// Everything one `update_collection` call wrote.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    /// The collection as saved, with backend ids on every fragment.
    pub collection: Collection,
    pub fragments: SyncReport,
    /// Whether the collection row was written. Any stored change to the
    /// collection, its fragments, labels or management advances `updated_at`.
    pub collection_written: bool,
    /// Label changes applied. Empty when none were made or they were dropped.
    pub labels: LabelDiff,
    /// Label changes were requested but the actor lacks the permission.
    pub labels_dropped: bool,
    pub management_written: bool,
    pub quality_checks_logged: Vec<QualityCheckKind>,
}

/// Saves, creates, copies and deletes collections through a backend.
pub struct CollectionService<B> {
    backend: Arc<B>,
    labels: Arc<LabelCatalog>,
}

impl<B: CollectionBackend> CollectionService<B> {
    /// Service with a label catalog configured from the environment.
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_label_catalog(backend, Arc::new(LabelCatalog::from_env()))
    }

    pub fn with_label_catalog(backend: Arc<B>, labels: Arc<LabelCatalog>) -> Self {
        Self { backend, labels }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn label_catalog(&self) -> &LabelCatalog {
        &self.labels
    }

    // =========================================================================
    // UPDATE
    // =========================================================================

    /// Persist the difference between `initial` (as last loaded) and
    /// `updated` (as edited).
    ///
    /// Validation and the version check run before any write. Fragment
    /// batches are all-or-nothing at the join; the label, management and row
    /// writes after them run in sequence and are not rolled back when a
    /// later one fails. The row write stamps a new `updated_at` whenever
    /// anything changed, so a second save from the same base is a conflict.
    #[instrument(skip_all, fields({ SUBSYSTEM } = "sync", { COMPONENT } = "service", { OPERATION } = "update_collection", { COLLECTION_ID } = %updated.id, { PROFILE_ID } = %actor.profile_id))]
    pub async fn update_collection(
        &self,
        initial: &Collection,
        mut updated: Collection,
        actor: &Actor,
        validation: Option<ValidationMode>,
        content_type: ContentType,
    ) -> Result<UpdateOutcome> {
        let start = Instant::now();

        if initial.id != updated.id {
            return Err(Error::InvalidInput(format!(
                "snapshots belong to different collections: {} and {}",
                initial.id, updated.id
            )));
        }
        if updated.content_type != content_type {
            return Err(Error::InvalidInput(format!(
                "{} {} cannot be saved as a {}",
                updated.content_type.noun(),
                updated.id,
                content_type.noun()
            )));
        }
        if !actor.can_edit(initial) {
            return Err(Error::Forbidden(format!(
                "profile {} may not edit {} {}",
                actor.profile_id,
                content_type.noun(),
                initial.id
            )));
        }
        if let Some(mode) = validation {
            ensure_valid(&updated, mode)?;
        }
        ensure_unique_ids(&updated.fragments)?;

        self.check_version(initial).await?;

        reindex_positions(&mut updated.fragments);
        let plan = plan_for(initial, &updated);
        let fragments_differ = fragments_changed(initial, &updated, &plan);
        let fragments = FragmentSynchronizer::new(self.backend.as_ref())
            .apply(updated.id, &mut updated.fragments, &plan)
            .await?;

        if content_type == ContentType::Collection && updated.thumbnail_path.is_none() {
            updated.thumbnail_path = self.derive_thumbnail(&updated.fragments).await?;
        }

        let requested = diff_labels(&initial.labels, &updated.labels);
        let labels = self
            .apply_labels(updated.id, requested.clone(), actor, content_type)
            .await?;
        let labels_dropped = labels.is_empty() && !requested.is_empty();
        if labels_dropped {
            updated.labels = initial.labels.clone();
        }

        let (management_written, quality_checks_logged) = self
            .apply_management(
                updated.id,
                initial.management.as_ref(),
                updated.management.as_ref(),
            )
            .await?;

        // Written last; a save that fails partway keeps the old `updated_at`.
        let collection_written = updated.core() != initial.core()
            || fragments_differ
            || !labels.is_empty()
            || management_written
            || !quality_checks_logged.is_empty();
        if collection_written {
            updated.updated_at = stored_now();
            updated.updated_by_profile_id = Some(actor.profile_id);
            let affected = self
                .backend
                .update(updated.id, updated.to_patch())
                .await
                .map_err(|e| Error::backend("update_collection", updated.id, e))?;
            if affected == 0 {
                return Err(Error::CollectionNotFound(updated.id));
            }
        }

        info!(
            { INSERT_COUNT } = fragments.inserted.len(),
            { UPDATE_COUNT } = fragments.updated.len(),
            { DELETE_COUNT } = fragments.deleted.len(),
            collection_written,
            management_written,
            { DURATION_MS } = start.elapsed().as_millis() as u64,
            "Collection saved"
        );

        Ok(UpdateOutcome {
            collection: updated,
            fragments,
            collection_written,
            labels,
            labels_dropped,
            management_written,
            quality_checks_logged,
        })
    }

    /// [`update_collection`](Self::update_collection) while holding the edit
    /// lock. The lock is released whatever the outcome.
    pub async fn update_with_lock<L: EditLockProvider + ?Sized>(
        &self,
        locks: &L,
        initial: &Collection,
        updated: Collection,
        actor: &Actor,
        validation: Option<ValidationMode>,
        content_type: ContentType,
    ) -> Result<UpdateOutcome> {
        locks.acquire_edit_lock(initial.id).await?;
        let result = self
            .update_collection(initial, updated, actor, validation, content_type)
            .await;
        if let Err(e) = locks.release_edit_lock(initial.id).await {
            warn!({ COLLECTION_ID } = %initial.id, { ERROR_MSG } = %e, "Failed to release edit lock");
        }
        result
    }

    async fn check_version(&self, initial: &Collection) -> Result<()> {
        let server = self
            .backend
            .fetch_updated_at(initial.id)
            .await
            .map_err(|e| Error::backend("fetch_updated_at", initial.id, e))?
            .ok_or(Error::CollectionNotFound(initial.id))?;

        if server != initial.updated_at {
            warn!(
                { COLLECTION_ID } = %initial.id,
                base = %initial.updated_at,
                server = %server,
                "Collection changed since it was loaded"
            );
            return Err(Error::Conflict {
                id: initial.id,
                base: initial.updated_at.to_rfc3339(),
                server: server.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// Thumbnail of the first media item, from its cached metadata or the
    /// item resolver.
    async fn derive_thumbnail(&self, fragments: &[Fragment]) -> Result<Option<String>> {
        let Some(first) = fragments.iter().find(|f| f.kind == FragmentKind::Item) else {
            return Ok(None);
        };

        if let Some(path) = first
            .item_meta
            .as_ref()
            .and_then(|meta| meta.thumbnail_path.clone())
        {
            return Ok(Some(path));
        }

        match first.external_id.as_deref() {
            Some(external_id) => self
                .backend
                .thumbnail_for_item(external_id)
                .await
                .map_err(|e| Error::backend("thumbnail_for_item", external_id, e)),
            None => Ok(None),
        }
    }

    /// Apply `diff` when the actor may edit quality labels on this content
    /// type. Returns what was applied.
    async fn apply_labels(
        &self,
        collection_id: Uuid,
        diff: LabelDiff,
        actor: &Actor,
        content_type: ContentType,
    ) -> Result<LabelDiff> {
        if diff.is_empty() {
            return Ok(diff);
        }
        if !actor.has(Permission::quality_labels_for(content_type)) {
            debug!(
                added = diff.added.len(),
                removed = diff.removed.len(),
                "Actor may not edit quality labels, dropping label changes"
            );
            return Ok(LabelDiff::default());
        }

        if !diff.added.is_empty() {
            self.backend
                .add_labels(collection_id, &diff.added)
                .await
                .map_err(|e| Error::backend("add_labels", collection_id, e))?;
        }
        if !diff.removed.is_empty() {
            self.backend
                .remove_labels(collection_id, &diff.removed)
                .await
                .map_err(|e| Error::backend("remove_labels", collection_id, e))?;
        }
        Ok(diff)
    }

    /// Write the management row and any changed quality checks.
    async fn apply_management(
        &self,
        collection_id: Uuid,
        initial: Option<&CollectionManagement>,
        updated: Option<&CollectionManagement>,
    ) -> Result<(bool, Vec<QualityCheckKind>)> {
        let Some(updated) = updated else {
            if initial.is_some() {
                debug!("Management removed locally, server row left untouched");
            }
            return Ok((false, Vec::new()));
        };

        let written = match initial {
            None => {
                self.backend
                    .insert_management(collection_id, updated.fields())
                    .await
                    .map_err(|e| Error::backend("insert_management", collection_id, e))?;
                true
            }
            Some(before) if before.fields() != updated.fields() => {
                self.backend
                    .update_management(collection_id, updated.fields())
                    .await
                    .map_err(|e| Error::backend("update_management", collection_id, e))?;
                true
            }
            Some(_) => false,
        };

        let mut logged = Vec::new();
        for entry in updated.latest_checks() {
            let blank = QualityCheckEntry {
                kind: entry.kind,
                status: None,
                assignee_profile_id: None,
                comment: None,
                created_at: None,
            };
            let previous = initial
                .and_then(|m| m.latest_check(entry.kind))
                .unwrap_or(&blank);
            if !entry.differs_from(previous) {
                continue;
            }

            self.backend
                .insert_quality_check(
                    collection_id,
                    QualityCheckEntry {
                        created_at: None,
                        ..entry.clone()
                    },
                )
                .await
                .map_err(|e| Error::backend("insert_quality_check", collection_id, e))?;
            logged.push(entry.kind);
        }

        Ok((written, logged))
    }

    // =========================================================================
    // CREATE / COPY / DELETE
    // =========================================================================

    /// Store a new collection and its fragments. Returns it with the ids the
    /// backend assigned.
    #[instrument(skip_all, fields({ SUBSYSTEM } = "sync", { COMPONENT } = "service", { OPERATION } = "insert_collection", { PROFILE_ID } = %actor.profile_id))]
    pub async fn insert_collection(
        &self,
        mut collection: Collection,
        actor: &Actor,
    ) -> Result<Collection> {
        collection.owner_profile_id.get_or_insert(actor.profile_id);
        if !actor.can_edit(&collection) {
            return Err(Error::Forbidden(format!(
                "profile {} may not create this {}",
                actor.profile_id,
                collection.content_type.noun()
            )));
        }
        ensure_valid(&collection, ValidationMode::Save)?;

        let now = stored_now();
        collection.created_at = now;
        collection.updated_at = now;
        collection.updated_by_profile_id = Some(actor.profile_id);
        reindex_positions(&mut collection.fragments);
        if collection.content_type == ContentType::Collection && collection.thumbnail_path.is_none()
        {
            collection.thumbnail_path = self.derive_thumbnail(&collection.fragments).await?;
        }

        let draft_id = collection.id;
        collection.id = self
            .backend
            .insert(collection.to_insert())
            .await
            .map_err(|e| Error::backend("insert_collection", draft_id, e))?;

        let plan = classify(&[], &collection.fragment_ids());
        let fragments = FragmentSynchronizer::new(self.backend.as_ref())
            .apply(collection.id, &mut collection.fragments, &plan)
            .await?;

        let requested = diff_labels(&[], &collection.labels);
        let labels = self
            .apply_labels(collection.id, requested, actor, collection.content_type)
            .await?;
        collection.labels = labels.added;

        let management = collection.management.clone();
        self.apply_management(collection.id, None, management.as_ref())
            .await?;

        info!(
            { COLLECTION_ID } = %collection.id,
            { INSERT_COUNT } = fragments.inserted.len(),
            "Collection created"
        );
        Ok(collection)
    }

    /// Copy `source` for `actor` as `"Kopie N: <title>"`.
    #[instrument(skip_all, fields({ SUBSYSTEM } = "sync", { COMPONENT } = "service", { OPERATION } = "duplicate_collection", { COLLECTION_ID } = %source.id, { PROFILE_ID } = %actor.profile_id))]
    pub async fn duplicate_collection(&self, source: &Collection, actor: &Actor) -> Result<Collection> {
        let titles = self
            .backend
            .titles_for_owner(actor.profile_id, source.content_type)
            .await
            .map_err(|e| Error::backend("titles_for_owner", actor.profile_id, e))?;

        let copy = duplicate_for(source, actor.profile_id, &titles);
        debug!(title = %copy.title, "Duplicating collection");
        self.insert_collection(copy, actor).await
    }

    /// Delete a collection and its fragments.
    #[instrument(skip(self, actor), fields({ SUBSYSTEM } = "sync", { COMPONENT } = "service", { OPERATION } = "delete_collection", { PROFILE_ID } = %actor.profile_id))]
    pub async fn delete_collection(&self, id: Uuid, actor: &Actor) -> Result<()> {
        let collection = self
            .backend
            .fetch(id)
            .await
            .map_err(|e| Error::backend("fetch", id, e))?
            .ok_or(Error::CollectionNotFound(id))?;

        if !actor.can_edit(&collection) {
            return Err(Error::Forbidden(format!(
                "profile {} may not delete {} {}",
                actor.profile_id,
                collection.content_type.noun(),
                id
            )));
        }

        let affected = self
            .backend
            .delete(id)
            .await
            .map_err(|e| Error::backend("delete_collection", id, e))?;
        if affected == 0 {
            return Err(Error::CollectionNotFound(id));
        }

        info!(fragment_count = collection.fragments.len(), "Collection deleted");
        Ok(())
    }

    /// The quality-label vocabulary, through the label catalog.
    pub async fn quality_labels(&self) -> Result<Vec<QualityLabel>> {
        self.labels.labels(self.backend.as_ref()).await
    }
}

/// Whether saving `plan` changes stored fragments: something is inserted or
/// deleted, or a kept fragment differs from its initial state.
fn fragments_changed(initial: &Collection, updated: &Collection, plan: &FragmentPlan) -> bool {
    if !plan.to_insert.is_empty() || !plan.to_delete.is_empty() {
        return true;
    }
    let patch_of = |collection: &Collection, id: i64| {
        collection
            .fragments
            .iter()
            .find(|f| f.id == FragmentId::Saved(id))
            .map(Fragment::to_patch)
    };
    plan.to_update
        .iter()
        .any(|&id| patch_of(initial, id) != patch_of(updated, id))
}
