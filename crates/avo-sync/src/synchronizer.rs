//! Applies a [`FragmentPlan`] to a backend.
//!
//! Insert, update and delete batches are dispatched concurrently and joined;
//! the first failure rejects the whole join. Ids assigned by the backend are
//! written back onto the in-memory fragments afterwards.

use std::time::Instant;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use avo_core::logging::{
    COLLECTION_ID, COMPONENT, DELETE_COUNT, DURATION_MS, FRAGMENT_ID, INSERT_COUNT, SUBSYSTEM,
    UPDATE_COUNT,
};
use avo_core::{Error, Fragment, FragmentId, FragmentPlan, FragmentRepository, Result};

/// What one synchronization did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Backend-assigned ids of inserted fragments, in plan order.
    pub inserted: Vec<i64>,
    pub updated: Vec<i64>,
    /// Deleted ids. A delete that matched no stored row is left out.
    pub deleted: Vec<i64>,
    /// Update targets that could not be found among the in-memory fragments.
    pub skipped: Vec<i64>,
}

/// Dispatches fragment writes for one collection.
pub struct FragmentSynchronizer<'a> {
    repo: &'a dyn FragmentRepository,
}

impl<'a> FragmentSynchronizer<'a> {
    pub fn new(repo: &'a dyn FragmentRepository) -> Self {
        Self { repo }
    }

    /// Apply `plan` to `fragments` of `collection_id`.
    ///
    /// `plan` must come from classifying `fragments` (its insert indices
    /// point into it). Positions are sent as they are; re-index first.
    #[instrument(skip(self, fragments, plan), fields({ SUBSYSTEM } = "sync", { COMPONENT } = "synchronizer", { COLLECTION_ID } = %collection_id, { INSERT_COUNT } = plan.to_insert.len(), { UPDATE_COUNT } = plan.to_update.len(), { DELETE_COUNT } = plan.to_delete.len()))]
    pub async fn apply(
        &self,
        collection_id: Uuid,
        fragments: &mut [Fragment],
        plan: &FragmentPlan,
    ) -> Result<SyncReport> {
        let start = Instant::now();

        let inserts = plan
            .to_insert
            .iter()
            .map(|&index| {
                fragments
                    .get(index)
                    .map(|f| f.to_insert(collection_id))
                    .ok_or_else(|| {
                        Error::InvalidInput(format!(
                            "insert index {} out of range for {} fragments",
                            index,
                            fragments.len()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut updates = Vec::with_capacity(plan.to_update.len());
        let mut skipped = Vec::new();
        for &id in &plan.to_update {
            match fragments.iter().find(|f| f.id == FragmentId::Saved(id)) {
                Some(fragment) => updates.push((id, fragment.to_patch())),
                None => {
                    warn!({ FRAGMENT_ID } = id, "Fragment to update not found locally, skipping");
                    skipped.push(id);
                }
            }
        }

        let repo = self.repo;
        let expected = inserts.len();

        let insert_batch = async move {
            if inserts.is_empty() {
                return Ok(Vec::new());
            }
            let ids = repo
                .insert_fragments(inserts)
                .await
                .map_err(|e| Error::backend("insert_fragments", collection_id, e))?;
            if ids.len() != expected {
                return Err(Error::backend(
                    "insert_fragments",
                    collection_id,
                    format!("backend returned {} ids for {} fragments", ids.len(), expected),
                ));
            }
            Ok(ids)
        };

        let delete_batch = try_join_all(plan.to_delete.iter().map(|&id| async move {
            let affected = repo
                .delete_fragment(id)
                .await
                .map_err(|e| Error::backend("delete_fragment", id, e))?;
            Ok::<_, Error>((id, affected))
        }));

        let update_batch = try_join_all(updates.into_iter().map(|(id, patch)| async move {
            let affected = repo
                .update_fragment(id, patch)
                .await
                .map_err(|e| Error::backend("update_fragment", id, e))?;
            if affected == 0 {
                return Err(Error::backend(
                    "update_fragment",
                    id,
                    "no stored fragment matched",
                ));
            }
            Ok::<_, Error>(id)
        }));

        let (new_ids, deletes, updated) =
            futures::try_join!(insert_batch, delete_batch, update_batch)?;

        for (&index, &id) in plan.to_insert.iter().zip(&new_ids) {
            fragments[index].id = FragmentId::Saved(id);
        }

        let mut deleted = Vec::with_capacity(deletes.len());
        for (id, affected) in deletes {
            if affected == 0 {
                warn!({ FRAGMENT_ID } = id, "Fragment to delete was already gone");
            } else {
                deleted.push(id);
            }
        }

        debug!(
            { DURATION_MS } = start.elapsed().as_millis() as u64,
            skipped = skipped.len(),
            "Fragments synchronized"
        );

        Ok(SyncReport {
            inserted: new_ids,
            updated,
            deleted,
            skipped,
        })
    }
}
