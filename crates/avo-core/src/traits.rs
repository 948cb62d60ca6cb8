//! Backend ports for collection persistence.
//!
//! These traits define the interfaces that concrete backends (the Hasura
//! GraphQL client, the REST proxy client, the in-memory backend) must
//! satisfy, so the synchronizer and orchestrator stay backend-agnostic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// FRAGMENT REPOSITORY TRAITS
// =============================================================================

/// Repository for fragment writes.
#[async_trait]
pub trait FragmentRepository: Send + Sync {
    /// Insert fragments in one batch. Returns the new ids in submitted order.
    async fn insert_fragments(&self, fragments: Vec<FragmentInsert>) -> Result<Vec<i64>>;

    /// Update one fragment. Returns the affected row count.
    async fn update_fragment(&self, id: i64, patch: FragmentPatch) -> Result<u64>;

    /// Delete one fragment. Returns the affected row count.
    async fn delete_fragment(&self, id: i64) -> Result<u64>;
}

// =============================================================================
// COLLECTION REPOSITORY TRAITS
// =============================================================================

/// Repository for collection and bundle rows.
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    /// Fetch a collection with its fragments, labels and management data.
    async fn fetch(&self, id: Uuid) -> Result<Option<Collection>>;

    /// The server-side `updated_at` of a collection (version check).
    async fn fetch_updated_at(&self, id: Uuid) -> Result<Option<DateTime<Utc>>>;

    /// Insert a collection row (without fragments).
    async fn insert(&self, collection: CollectionInsert) -> Result<Uuid>;

    /// Update a collection row. Returns the affected row count.
    async fn update(&self, id: Uuid, patch: CollectionPatch) -> Result<u64>;

    /// Delete a collection and its fragments. Returns the affected row count.
    async fn delete(&self, id: Uuid) -> Result<u64>;

    /// Titles of every collection of the given type owned by `owner`.
    async fn titles_for_owner(&self, owner: Uuid, content_type: ContentType)
        -> Result<Vec<String>>;
}

// =============================================================================
// LABEL REPOSITORY TRAITS
// =============================================================================

/// Repository for editorial quality labels.
#[async_trait]
pub trait LabelRepository: Send + Sync {
    /// The full quality-label vocabulary.
    async fn list_quality_labels(&self) -> Result<Vec<QualityLabel>>;

    /// Attach labels to a collection.
    async fn add_labels(&self, collection_id: Uuid, labels: &[String]) -> Result<()>;

    /// Detach labels from a collection.
    async fn remove_labels(&self, collection_id: Uuid, labels: &[String]) -> Result<()>;
}

// =============================================================================
// MANAGEMENT REPOSITORY TRAITS
// =============================================================================

/// Repository for management/workflow metadata.
#[async_trait]
pub trait ManagementRepository: Send + Sync {
    async fn insert_management(&self, collection_id: Uuid, fields: ManagementFields)
        -> Result<()>;

    async fn update_management(&self, collection_id: Uuid, fields: ManagementFields)
        -> Result<()>;

    /// Append one quality-check audit entry.
    async fn insert_quality_check(&self, collection_id: Uuid, entry: QualityCheckEntry)
        -> Result<()>;
}

// =============================================================================
// MEDIA ITEM TRAITS
// =============================================================================

/// Lookup of media item metadata not cached on the fragment.
#[async_trait]
pub trait ItemResolver: Send + Sync {
    /// Thumbnail path of the media item with the given external id.
    async fn thumbnail_for_item(&self, external_id: &str) -> Result<Option<String>>;
}

/// Everything the collection service needs from a backend.
pub trait CollectionBackend:
    FragmentRepository + CollectionRepository + LabelRepository + ManagementRepository + ItemResolver
{
}

impl<T> CollectionBackend for T where
    T: FragmentRepository
        + CollectionRepository
        + LabelRepository
        + ManagementRepository
        + ItemResolver
{
}

// =============================================================================
// PROXY TRAITS
// =============================================================================

/// Edit locks, so two editors do not overwrite each other.
#[async_trait]
pub trait EditLockProvider: Send + Sync {
    /// Acquire (or refresh) the lock for `collection_id`.
    /// Fails with `Error::Locked` when another profile holds it.
    async fn acquire_edit_lock(&self, collection_id: Uuid) -> Result<EditLock>;

    /// Release the lock for `collection_id`.
    async fn release_edit_lock(&self, collection_id: Uuid) -> Result<()>;
}

/// Sharing a collection with other profiles.
#[async_trait]
pub trait ContributorRepository: Send + Sync {
    async fn list_contributors(&self, collection_id: Uuid) -> Result<Vec<Contributor>>;

    async fn add_contributor(
        &self,
        collection_id: Uuid,
        email: &str,
        rights: ContributorRight,
    ) -> Result<()>;

    async fn remove_contributor(&self, collection_id: Uuid, contributor_id: Uuid) -> Result<()>;
}
