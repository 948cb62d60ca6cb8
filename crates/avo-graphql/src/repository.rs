//! Port implementations for [`HasuraClient`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

use avo_core::logging::{
    COLLECTION_ID, COMPONENT, FRAGMENT_ID, INSERT_COUNT, OPERATION, SUBSYSTEM,
};
use avo_core::{
    Collection, CollectionInsert, CollectionManagement, CollectionPatch, CollectionRepository,
    ContentType, Error, Fragment, FragmentId, FragmentInsert, FragmentKind, FragmentPatch,
    FragmentRepository, ItemMeta, ItemResolver, LabelRepository, ManagementFields,
    ManagementRepository, QualityCheckEntry, QualityCheckKind, QualityLabel, Result,
};

use crate::client::HasuraClient;
use crate::queries;

// =============================================================================
// COLUMN MAPPINGS
// =============================================================================

/// `type_id` column value for a content type.
pub fn type_id(content_type: ContentType) -> i32 {
    match content_type {
        ContentType::Collection => 3,
        ContentType::Bundle => 4,
    }
}

fn content_type_from_id(type_id: i32) -> Result<ContentType> {
    match type_id {
        3 => Ok(ContentType::Collection),
        4 => Ok(ContentType::Bundle),
        other => Err(Error::Serialization(format!(
            "unsupported collection type_id {}",
            other
        ))),
    }
}

/// `qc_label` column value for a quality-check kind.
pub fn qc_label(kind: QualityCheckKind) -> &'static str {
    match kind {
        QualityCheckKind::LanguageCheck => "TAALCHECK",
        QualityCheckKind::QualityCheck => "KWALITEITSCHECK",
        QualityCheckKind::ApprovedForPublication => "EINDCHECK",
    }
}

fn qc_kind_from_label(label: &str) -> Result<QualityCheckKind> {
    match label {
        "TAALCHECK" => Ok(QualityCheckKind::LanguageCheck),
        "KWALITEITSCHECK" => Ok(QualityCheckKind::QualityCheck),
        "EINDCHECK" => Ok(QualityCheckKind::ApprovedForPublication),
        other => Err(Error::Serialization(format!("unknown qc_label {}", other))),
    }
}

// =============================================================================
// ROWS
// =============================================================================

#[derive(Deserialize)]
struct ByPk<T> {
    app_collections_by_pk: Option<T>,
}

#[derive(Deserialize)]
struct UpdatedAtRow {
    updated_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct LabelRow {
    label: String,
}

#[derive(Deserialize)]
struct ManagementRow {
    current_status: Option<String>,
    manager_profile_id: Option<Uuid>,
    status_valid_until: Option<DateTime<Utc>>,
    note: Option<String>,
}

#[derive(Deserialize)]
struct QualityCheckRow {
    qc_label: String,
    qc_status: Option<bool>,
    assignee_profile_id: Option<Uuid>,
    comment: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct FragmentRow {
    id: FragmentId,
    position: i32,
    #[serde(rename = "type")]
    kind: FragmentKind,
    external_id: Option<String>,
    #[serde(default)]
    use_custom_fields: bool,
    custom_title: Option<String>,
    custom_description: Option<String>,
    start_oc: Option<i32>,
    end_oc: Option<i32>,
    item_meta: Option<ItemMeta>,
}

impl From<FragmentRow> for Fragment {
    fn from(row: FragmentRow) -> Self {
        Fragment {
            id: row.id,
            position: row.position,
            kind: row.kind,
            external_id: row.external_id,
            use_custom_fields: row.use_custom_fields,
            custom_title: row.custom_title,
            custom_description: row.custom_description,
            start_oc: row.start_oc,
            end_oc: row.end_oc,
            item_meta: row.item_meta,
        }
    }
}

#[derive(Deserialize)]
struct CollectionRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    description_long: Option<String>,
    #[serde(default)]
    is_public: bool,
    owner_profile_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    updated_by_profile_id: Option<Uuid>,
    thumbnail_path: Option<String>,
    type_id: i32,
    #[serde(default)]
    lom_context: Option<Vec<String>>,
    #[serde(default)]
    lom_classification: Option<Vec<String>>,
    #[serde(default)]
    collection_labels: Vec<LabelRow>,
    management: Option<ManagementRow>,
    #[serde(default)]
    management_quality_check: Vec<QualityCheckRow>,
    #[serde(default)]
    collection_fragments: Vec<FragmentRow>,
}

impl TryFrom<CollectionRow> for Collection {
    type Error = Error;

    fn try_from(row: CollectionRow) -> Result<Self> {
        let quality_checks = row
            .management_quality_check
            .into_iter()
            .map(|qc| {
                Ok(QualityCheckEntry {
                    kind: qc_kind_from_label(&qc.qc_label)?,
                    status: qc.qc_status,
                    assignee_profile_id: qc.assignee_profile_id,
                    comment: qc.comment,
                    created_at: qc.created_at,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let management = row.management.map(|m| CollectionManagement {
            current_status: m.current_status,
            manager_profile_id: m.manager_profile_id,
            status_valid_until: m.status_valid_until,
            note: m.note,
            quality_checks,
        });

        Ok(Collection {
            id: row.id,
            title: row.title,
            description: row.description,
            description_long: row.description_long,
            is_public: row.is_public,
            owner_profile_id: row.owner_profile_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            updated_by_profile_id: row.updated_by_profile_id,
            thumbnail_path: row.thumbnail_path,
            content_type: content_type_from_id(row.type_id)?,
            lom_context: row.lom_context.unwrap_or_default(),
            lom_classification: row.lom_classification.unwrap_or_default(),
            labels: row.collection_labels.into_iter().map(|l| l.label).collect(),
            management,
            fragments: row
                .collection_fragments
                .into_iter()
                .map(Fragment::from)
                .collect(),
        })
    }
}

#[derive(Deserialize)]
struct Returning<T> {
    returning: Vec<T>,
}

#[derive(Deserialize)]
struct IdRow<T> {
    id: T,
}

#[derive(Deserialize)]
struct AffectedRows {
    affected_rows: u64,
}

/// Hasura insert input for `app_collections`.
#[derive(Serialize)]
struct CollectionInsertInput {
    id: Uuid,
    title: String,
    description: Option<String>,
    description_long: Option<String>,
    is_public: bool,
    owner_profile_id: Option<Uuid>,
    thumbnail_path: Option<String>,
    type_id: i32,
    lom_context: Vec<String>,
    lom_classification: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CollectionInsert> for CollectionInsertInput {
    fn from(c: CollectionInsert) -> Self {
        Self {
            id: c.id,
            title: c.title,
            description: c.description,
            description_long: c.description_long,
            is_public: c.is_public,
            owner_profile_id: c.owner_profile_id,
            thumbnail_path: c.thumbnail_path,
            type_id: type_id(c.content_type),
            lom_context: c.lom_context,
            lom_classification: c.lom_classification,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

// =============================================================================
// FRAGMENTS
// =============================================================================

#[async_trait]
impl FragmentRepository for HasuraClient {
    #[instrument(skip(self, fragments), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "insert_fragments", { INSERT_COUNT } = fragments.len()))]
    async fn insert_fragments(&self, fragments: Vec<FragmentInsert>) -> Result<Vec<i64>> {
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        #[derive(Deserialize)]
        struct Data {
            insert_app_collection_fragments: Returning<IdRow<i64>>,
        }

        let data: Data = self
            .execute(
                "insert_fragments",
                queries::INSERT_FRAGMENTS,
                json!({ "fragments": fragments }),
            )
            .await?;

        Ok(data
            .insert_app_collection_fragments
            .returning
            .into_iter()
            .map(|row| row.id)
            .collect())
    }

    #[instrument(skip(self, patch), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "update_fragment", { FRAGMENT_ID } = id))]
    async fn update_fragment(&self, id: i64, patch: FragmentPatch) -> Result<u64> {
        #[derive(Deserialize)]
        struct Data {
            update_app_collection_fragments: AffectedRows,
        }

        let data: Data = self
            .execute(
                "update_fragment",
                queries::UPDATE_FRAGMENT,
                json!({ "id": id, "fragment": patch }),
            )
            .await?;
        Ok(data.update_app_collection_fragments.affected_rows)
    }

    #[instrument(skip(self), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "delete_fragment", { FRAGMENT_ID } = id))]
    async fn delete_fragment(&self, id: i64) -> Result<u64> {
        #[derive(Deserialize)]
        struct Data {
            delete_app_collection_fragments: AffectedRows,
        }

        let data: Data = self
            .execute(
                "delete_fragment",
                queries::DELETE_FRAGMENT,
                json!({ "id": id }),
            )
            .await?;
        Ok(data.delete_app_collection_fragments.affected_rows)
    }
}

// =============================================================================
// COLLECTIONS
// =============================================================================

#[async_trait]
impl CollectionRepository for HasuraClient {
    #[instrument(skip(self), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "fetch_collection", { COLLECTION_ID } = %id))]
    async fn fetch(&self, id: Uuid) -> Result<Option<Collection>> {
        let data: ByPk<CollectionRow> = self
            .execute(
                "fetch_collection",
                queries::GET_COLLECTION_BY_ID,
                json!({ "id": id }),
            )
            .await?;
        data.app_collections_by_pk
            .map(Collection::try_from)
            .transpose()
    }

    async fn fetch_updated_at(&self, id: Uuid) -> Result<Option<DateTime<Utc>>> {
        let data: ByPk<UpdatedAtRow> = self
            .execute(
                "fetch_collection_updated_at",
                queries::GET_COLLECTION_UPDATED_AT,
                json!({ "id": id }),
            )
            .await?;
        Ok(data.app_collections_by_pk.map(|row| row.updated_at))
    }

    #[instrument(skip(self, collection), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "insert_collection", { COLLECTION_ID } = %collection.id))]
    async fn insert(&self, collection: CollectionInsert) -> Result<Uuid> {
        #[derive(Deserialize)]
        struct Data {
            insert_app_collections: Returning<IdRow<Uuid>>,
        }

        let input = CollectionInsertInput::from(collection);
        let data: Data = self
            .execute(
                "insert_collection",
                queries::INSERT_COLLECTION,
                json!({ "collection": input }),
            )
            .await?;

        data.insert_app_collections
            .returning
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| Error::GraphQl("insert_collection: no id returned".to_string()))
    }

    #[instrument(skip(self, patch), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "update_collection", { COLLECTION_ID } = %id))]
    async fn update(&self, id: Uuid, patch: CollectionPatch) -> Result<u64> {
        #[derive(Deserialize)]
        struct Data {
            update_app_collections: AffectedRows,
        }

        let data: Data = self
            .execute(
                "update_collection",
                queries::UPDATE_COLLECTION,
                json!({ "id": id, "collection": patch }),
            )
            .await?;
        Ok(data.update_app_collections.affected_rows)
    }

    #[instrument(skip(self), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "delete_collection", { COLLECTION_ID } = %id))]
    async fn delete(&self, id: Uuid) -> Result<u64> {
        #[derive(Deserialize)]
        struct Data {
            delete_app_collection_fragments: AffectedRows,
            delete_app_collections: AffectedRows,
        }

        let data: Data = self
            .execute(
                "delete_collection",
                queries::DELETE_COLLECTION,
                json!({ "id": id }),
            )
            .await?;
        debug!(
            fragments = data.delete_app_collection_fragments.affected_rows,
            "Deleted collection fragments"
        );
        Ok(data.delete_app_collections.affected_rows)
    }

    async fn titles_for_owner(
        &self,
        owner: Uuid,
        content_type: ContentType,
    ) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct TitleRow {
            title: String,
        }
        #[derive(Deserialize)]
        struct Data {
            app_collections: Vec<TitleRow>,
        }

        let data: Data = self
            .execute(
                "titles_for_owner",
                queries::GET_COLLECTION_TITLES_BY_OWNER,
                json!({ "owner": owner, "typeId": type_id(content_type) }),
            )
            .await?;
        Ok(data.app_collections.into_iter().map(|r| r.title).collect())
    }
}

// =============================================================================
// LABELS
// =============================================================================

#[async_trait]
impl LabelRepository for HasuraClient {
    async fn list_quality_labels(&self) -> Result<Vec<QualityLabel>> {
        #[derive(Deserialize)]
        struct Data {
            lookup_enum_collection_labels: Vec<QualityLabel>,
        }

        let data: Data = self
            .execute("list_quality_labels", queries::GET_QUALITY_LABELS, json!({}))
            .await?;
        Ok(data.lookup_enum_collection_labels)
    }

    #[instrument(skip(self, labels), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "add_labels", { COLLECTION_ID } = %collection_id))]
    async fn add_labels(&self, collection_id: Uuid, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }

        #[derive(Deserialize)]
        struct Data {
            #[allow(dead_code)]
            insert_app_collection_labels: AffectedRows,
        }

        let objects: Vec<_> = labels
            .iter()
            .map(|label| json!({ "collection_uuid": collection_id, "label": label }))
            .collect();
        let _: Data = self
            .execute(
                "add_labels",
                queries::INSERT_COLLECTION_LABELS,
                json!({ "objects": objects }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, labels), fields({ SUBSYSTEM } = "graphql", { COMPONENT } = "hasura", { OPERATION } = "remove_labels", { COLLECTION_ID } = %collection_id))]
    async fn remove_labels(&self, collection_id: Uuid, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }

        #[derive(Deserialize)]
        struct Data {
            #[allow(dead_code)]
            delete_app_collection_labels: AffectedRows,
        }

        let _: Data = self
            .execute(
                "remove_labels",
                queries::DELETE_COLLECTION_LABELS,
                json!({ "collectionId": collection_id, "labels": labels }),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// MANAGEMENT
// =============================================================================

#[async_trait]
impl ManagementRepository for HasuraClient {
    async fn insert_management(&self, collection_id: Uuid, fields: ManagementFields) -> Result<()> {
        #[derive(Deserialize)]
        struct Data {
            #[allow(dead_code)]
            insert_app_collection_management: AffectedRows,
        }

        let mut management = serde_json::to_value(&fields)?;
        management["collection_id"] = json!(collection_id);
        let _: Data = self
            .execute(
                "insert_management",
                queries::INSERT_MANAGEMENT,
                json!({ "management": management }),
            )
            .await?;
        Ok(())
    }

    async fn update_management(&self, collection_id: Uuid, fields: ManagementFields) -> Result<()> {
        #[derive(Deserialize)]
        struct Data {
            update_app_collection_management: AffectedRows,
        }

        let data: Data = self
            .execute(
                "update_management",
                queries::UPDATE_MANAGEMENT,
                json!({ "collectionId": collection_id, "management": fields }),
            )
            .await?;
        if data.update_app_collection_management.affected_rows == 0 {
            return Err(Error::NotFound(format!(
                "management row for collection {}",
                collection_id
            )));
        }
        Ok(())
    }

    async fn insert_quality_check(
        &self,
        collection_id: Uuid,
        entry: QualityCheckEntry,
    ) -> Result<()> {
        #[derive(Deserialize)]
        struct Data {
            #[allow(dead_code)]
            #[serde(rename = "insert_app_collection_management_QC_one")]
            inserted: Option<IdRow<i64>>,
        }

        let object = json!({
            "collection_id": collection_id,
            "qc_label": qc_label(entry.kind),
            "qc_status": entry.status,
            "assignee_profile_id": entry.assignee_profile_id,
            "comment": entry.comment,
        });
        let _: Data = self
            .execute(
                "insert_quality_check",
                queries::INSERT_QUALITY_CHECK,
                json!({ "entry": object }),
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// ITEMS
// =============================================================================

#[async_trait]
impl ItemResolver for HasuraClient {
    async fn thumbnail_for_item(&self, external_id: &str) -> Result<Option<String>> {
        #[derive(Deserialize)]
        struct ItemRow {
            thumbnail_path: Option<String>,
        }
        #[derive(Deserialize)]
        struct Data {
            app_item_meta: Vec<ItemRow>,
        }

        let data: Data = self
            .execute(
                "thumbnail_for_item",
                queries::GET_ITEM_THUMBNAIL,
                json!({ "externalId": external_id }),
            )
            .await?;
        Ok(data
            .app_item_meta
            .into_iter()
            .next()
            .and_then(|row| row.thumbnail_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_round_trip() {
        for ct in [ContentType::Collection, ContentType::Bundle] {
            assert_eq!(content_type_from_id(type_id(ct)).unwrap(), ct);
        }
        assert!(content_type_from_id(1).is_err());
    }

    #[test]
    fn test_qc_label_mapping() {
        assert_eq!(qc_label(QualityCheckKind::LanguageCheck), "TAALCHECK");
        assert_eq!(
            qc_kind_from_label("EINDCHECK").unwrap(),
            QualityCheckKind::ApprovedForPublication
        );
        assert!(qc_kind_from_label("OTHER").is_err());
    }

    #[test]
    fn test_collection_row_maps_management_and_labels() {
        let row: CollectionRow = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-000000000001",
            "title": "Klimaat",
            "description": null,
            "description_long": null,
            "is_public": true,
            "owner_profile_id": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "updated_by_profile_id": null,
            "thumbnail_path": null,
            "type_id": 4,
            "lom_context": null,
            "lom_classification": ["Geschiedenis"],
            "collection_labels": [{ "label": "EXEMPLARY" }],
            "management": { "current_status": "ACTIEF", "manager_profile_id": null, "status_valid_until": null, "note": null },
            "management_quality_check": [
                { "qc_label": "TAALCHECK", "qc_status": true, "assignee_profile_id": null, "comment": null, "created_at": null }
            ],
            "collection_fragments": [
                { "id": 5, "position": 1, "type": "COLLECTION", "external_id": "x", "custom_title": null, "custom_description": null, "start_oc": null, "end_oc": null, "item_meta": null }
            ]
        }))
        .unwrap();

        let collection = Collection::try_from(row).unwrap();
        assert_eq!(collection.content_type, ContentType::Bundle);
        assert!(collection.lom_context.is_empty());
        assert_eq!(collection.labels, vec!["EXEMPLARY"]);
        let management = collection.management.unwrap();
        assert_eq!(management.current_status.as_deref(), Some("ACTIEF"));
        assert_eq!(management.quality_checks.len(), 1);
        assert_eq!(collection.fragments[0].id, FragmentId::Saved(5));
    }
}
