//! Domain models for AVO collections, bundles, and their fragments.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

// =============================================================================
// FRAGMENT IDENTITY
// =============================================================================

/// Identity of a fragment: either not yet persisted, or persisted under a
/// backend-assigned id.
///
/// On the wire the editor sends `null`, negative placeholders, `0` or `-0`
/// for fragments it created locally. All of those decode to `Unsaved`, so
/// no placeholder can ever collide with a persisted id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FragmentId {
    #[default]
    Unsaved,
    Saved(i64),
}

impl FragmentId {
    /// Decode a raw numeric id. Only strictly positive integers are persisted ids.
    pub fn from_f64(raw: f64) -> Self {
        if raw.is_finite() && raw > 0.0 && raw.fract() == 0.0 && raw <= i64::MAX as f64 {
            FragmentId::Saved(raw as i64)
        } else {
            FragmentId::Unsaved
        }
    }

    /// Decode an optional integer id.
    pub fn from_raw(raw: Option<i64>) -> Self {
        match raw {
            Some(id) if id > 0 => FragmentId::Saved(id),
            _ => FragmentId::Unsaved,
        }
    }

    pub fn saved(self) -> Option<i64> {
        match self {
            FragmentId::Saved(id) => Some(id),
            FragmentId::Unsaved => None,
        }
    }

    pub fn is_saved(self) -> bool {
        matches!(self, FragmentId::Saved(_))
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FragmentId::Saved(id) => write!(f, "{}", id),
            FragmentId::Unsaved => write!(f, "unsaved"),
        }
    }
}

impl Serialize for FragmentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FragmentId::Saved(id) => serializer.serialize_i64(*id),
            FragmentId::Unsaved => serializer.serialize_none(),
        }
    }
}

struct FragmentIdVisitor;

impl<'de> Visitor<'de> for FragmentIdVisitor {
    type Value = FragmentId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a fragment id (number or null)")
    }

    fn visit_unit<E: de::Error>(self) -> Result<FragmentId, E> {
        Ok(FragmentId::Unsaved)
    }

    fn visit_none<E: de::Error>(self) -> Result<FragmentId, E> {
        Ok(FragmentId::Unsaved)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<FragmentId, D::Error> {
        deserializer.deserialize_any(FragmentIdVisitor)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FragmentId, E> {
        Ok(FragmentId::from_raw(Some(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FragmentId, E> {
        match i64::try_from(v) {
            Ok(id) => Ok(FragmentId::from_raw(Some(id))),
            Err(_) => Err(E::custom(format!("fragment id {} out of range", v))),
        }
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FragmentId, E> {
        Ok(FragmentId::from_f64(v))
    }
}

impl<'de> Deserialize<'de> for FragmentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FragmentIdVisitor)
    }
}

// =============================================================================
// FRAGMENTS
// =============================================================================

/// What a fragment renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FragmentKind {
    /// An audiovisual media item, referenced by `external_id`.
    Item,
    /// Free text; content lives in the custom fields.
    Text,
    /// A sub-collection inside a bundle, referenced by `external_id`.
    Collection,
}

/// Denormalized copy of the referenced media item. Read-only; never persisted
/// as part of the fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemMeta {
    pub external_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    /// "video", "audio", "collection", ...
    #[serde(default)]
    pub media_type: Option<String>,
}

/// One ordered content block of a collection or bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub id: FragmentId,
    #[serde(default)]
    pub position: i32,
    #[serde(rename = "type")]
    pub kind: FragmentKind,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub use_custom_fields: bool,
    #[serde(default)]
    pub custom_title: Option<String>,
    #[serde(default)]
    pub custom_description: Option<String>,
    /// Cut start in seconds.
    #[serde(default)]
    pub start_oc: Option<i32>,
    /// Cut end in seconds.
    #[serde(default)]
    pub end_oc: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_meta: Option<ItemMeta>,
}

impl Fragment {
    fn blank(kind: FragmentKind) -> Self {
        Self {
            id: FragmentId::Unsaved,
            position: 0,
            kind,
            external_id: None,
            use_custom_fields: false,
            custom_title: None,
            custom_description: None,
            start_oc: None,
            end_oc: None,
            item_meta: None,
        }
    }

    /// New media item fragment.
    pub fn item(external_id: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            ..Self::blank(FragmentKind::Item)
        }
    }

    /// New text fragment.
    pub fn text(title: Option<&str>, body: Option<&str>) -> Self {
        Self {
            use_custom_fields: true,
            custom_title: title.map(str::to_string),
            custom_description: body.map(str::to_string),
            ..Self::blank(FragmentKind::Text)
        }
    }

    /// New sub-collection fragment (bundles only).
    pub fn collection(collection_id: Uuid) -> Self {
        Self {
            external_id: Some(collection_id.to_string()),
            ..Self::blank(FragmentKind::Collection)
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = FragmentId::from_raw(Some(id));
        self
    }

    pub fn with_custom_fields(mut self, title: &str, description: &str) -> Self {
        self.use_custom_fields = true;
        self.custom_title = Some(title.to_string());
        self.custom_description = Some(description.to_string());
        self
    }

    pub fn with_cut(mut self, start: i32, end: i32) -> Self {
        self.start_oc = Some(start);
        self.end_oc = Some(end);
        self
    }

    pub fn with_item_meta(mut self, meta: ItemMeta) -> Self {
        self.item_meta = Some(meta);
        self
    }

    /// Persistable fields for an insert into `collection_id`.
    pub fn to_insert(&self, collection_id: Uuid) -> FragmentInsert {
        FragmentInsert {
            collection_uuid: collection_id,
            position: self.position,
            kind: self.kind,
            external_id: self.external_id.clone(),
            use_custom_fields: self.use_custom_fields,
            custom_title: self.custom_title.clone(),
            custom_description: self.custom_description.clone(),
            start_oc: self.start_oc,
            end_oc: self.end_oc,
        }
    }

    /// Persistable fields for an update of an existing fragment.
    pub fn to_patch(&self) -> FragmentPatch {
        FragmentPatch {
            position: self.position,
            external_id: self.external_id.clone(),
            use_custom_fields: self.use_custom_fields,
            custom_title: self.custom_title.clone(),
            custom_description: self.custom_description.clone(),
            start_oc: self.start_oc,
            end_oc: self.end_oc,
        }
    }
}

/// Insert payload for a fragment: no id, no cached item metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentInsert {
    pub collection_uuid: Uuid,
    pub position: i32,
    #[serde(rename = "type")]
    pub kind: FragmentKind,
    pub external_id: Option<String>,
    pub use_custom_fields: bool,
    pub custom_title: Option<String>,
    pub custom_description: Option<String>,
    pub start_oc: Option<i32>,
    pub end_oc: Option<i32>,
}

/// Partial update payload for an existing fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentPatch {
    pub position: i32,
    pub external_id: Option<String>,
    pub use_custom_fields: bool,
    pub custom_title: Option<String>,
    pub custom_description: Option<String>,
    pub start_oc: Option<i32>,
    pub end_oc: Option<i32>,
}

// =============================================================================
// COLLECTIONS
// =============================================================================

/// Whether a container holds media items (collection) or collections (bundle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Collection,
    Bundle,
}

impl ContentType {
    /// Noun used in user-facing messages.
    pub fn noun(self) -> &'static str {
        match self {
            ContentType::Collection => "collection",
            ContentType::Bundle => "bundle",
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "collection" => Ok(ContentType::Collection),
            "bundle" => Ok(ContentType::Bundle),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

/// The current time at the precision the database keeps (microseconds).
///
/// Every `updated_at` stamped by a save goes through this, so a stamped
/// snapshot compares equal to the value read back from the server.
pub fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A titled, ordered container of fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_long: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub owner_profile_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by_profile_id: Option<Uuid>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
    #[serde(rename = "type", default)]
    pub content_type: ContentType,
    /// Education levels.
    #[serde(default)]
    pub lom_context: Vec<String>,
    /// Subjects.
    #[serde(default)]
    pub lom_classification: Vec<String>,
    /// Editorial quality labels.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub management: Option<CollectionManagement>,
    #[serde(default)]
    pub fragments: Vec<Fragment>,
}

/// The user-editable subset of a collection that decides whether the
/// collection row itself needs a write.
#[derive(Debug, PartialEq)]
pub struct CollectionCore<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub description_long: Option<&'a str>,
    pub is_public: bool,
    pub thumbnail_path: Option<&'a str>,
    pub lom_context: &'a [String],
    pub lom_classification: &'a [String],
}

impl Collection {
    /// Empty private collection owned by `owner`.
    pub fn new(title: impl Into<String>, content_type: ContentType, owner: Uuid) -> Self {
        let now = stored_now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            description_long: None,
            is_public: false,
            owner_profile_id: Some(owner),
            created_at: now,
            updated_at: now,
            updated_by_profile_id: Some(owner),
            thumbnail_path: None,
            content_type,
            lom_context: Vec::new(),
            lom_classification: Vec::new(),
            labels: Vec::new(),
            management: None,
            fragments: Vec::new(),
        }
    }

    pub fn core(&self) -> CollectionCore<'_> {
        CollectionCore {
            title: &self.title,
            description: self.description.as_deref(),
            description_long: self.description_long.as_deref(),
            is_public: self.is_public,
            thumbnail_path: self.thumbnail_path.as_deref(),
            lom_context: &self.lom_context,
            lom_classification: &self.lom_classification,
        }
    }

    /// Ids of all persisted and unsaved fragments, in order.
    pub fn fragment_ids(&self) -> Vec<FragmentId> {
        self.fragments.iter().map(|f| f.id).collect()
    }

    pub fn to_patch(&self) -> CollectionPatch {
        CollectionPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            description_long: self.description_long.clone(),
            is_public: self.is_public,
            thumbnail_path: self.thumbnail_path.clone(),
            lom_context: self.lom_context.clone(),
            lom_classification: self.lom_classification.clone(),
            updated_at: self.updated_at,
            updated_by_profile_id: self.updated_by_profile_id,
        }
    }

    pub fn to_insert(&self) -> CollectionInsert {
        CollectionInsert {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            description_long: self.description_long.clone(),
            is_public: self.is_public,
            owner_profile_id: self.owner_profile_id,
            thumbnail_path: self.thumbnail_path.clone(),
            content_type: self.content_type,
            lom_context: self.lom_context.clone(),
            lom_classification: self.lom_classification.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Collection row fields written on update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionPatch {
    pub title: String,
    pub description: Option<String>,
    pub description_long: Option<String>,
    pub is_public: bool,
    pub thumbnail_path: Option<String>,
    pub lom_context: Vec<String>,
    pub lom_classification: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by_profile_id: Option<Uuid>,
}

/// Collection row fields written on insert. Fragments are inserted separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInsert {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub description_long: Option<String>,
    pub is_public: bool,
    pub owner_profile_id: Option<Uuid>,
    pub thumbnail_path: Option<String>,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub lom_context: Vec<String>,
    pub lom_classification: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// MANAGEMENT / WORKFLOW
// =============================================================================

/// Which editorial check a quality-check entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityCheckKind {
    LanguageCheck,
    QualityCheck,
    ApprovedForPublication,
}

/// One audit entry of an editorial check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheckEntry {
    pub kind: QualityCheckKind,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub assignee_profile_id: Option<Uuid>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl QualityCheckEntry {
    /// True when status, assignee or comment differ. Timestamps are ignored.
    pub fn differs_from(&self, other: &QualityCheckEntry) -> bool {
        self.status != other.status
            || self.assignee_profile_id != other.assignee_profile_id
            || self.comment != other.comment
    }
}

/// Management workflow metadata attached to a collection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CollectionManagement {
    #[serde(default)]
    pub current_status: Option<String>,
    #[serde(default)]
    pub manager_profile_id: Option<Uuid>,
    #[serde(default)]
    pub status_valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub quality_checks: Vec<QualityCheckEntry>,
}

impl CollectionManagement {
    pub fn fields(&self) -> ManagementFields {
        ManagementFields {
            current_status: self.current_status.clone(),
            manager_profile_id: self.manager_profile_id,
            status_valid_until: self.status_valid_until,
            note: self.note.clone(),
        }
    }

    /// The most recent entry of each kind, in first-seen kind order.
    pub fn latest_checks(&self) -> Vec<&QualityCheckEntry> {
        let mut latest: Vec<&QualityCheckEntry> = Vec::new();
        for entry in &self.quality_checks {
            match latest.iter_mut().find(|e| e.kind == entry.kind) {
                Some(slot) => *slot = entry,
                None => latest.push(entry),
            }
        }
        latest
    }

    pub fn latest_check(&self, kind: QualityCheckKind) -> Option<&QualityCheckEntry> {
        self.quality_checks.iter().rev().find(|e| e.kind == kind)
    }
}

/// Management row fields, without the quality-check history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementFields {
    pub current_status: Option<String>,
    pub manager_profile_id: Option<Uuid>,
    pub status_valid_until: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

// =============================================================================
// LABELS
// =============================================================================

/// One entry of the editorial quality-label vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLabel {
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
}

// =============================================================================
// ACTORS & PERMISSIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    EditOwnCollections,
    EditAnyCollections,
    EditOwnBundles,
    EditAnyBundles,
    EditCollectionQualityLabels,
    EditBundleQualityLabels,
}

impl Permission {
    /// Permission needed to change quality labels on the given content type.
    pub fn quality_labels_for(content_type: ContentType) -> Self {
        match content_type {
            ContentType::Collection => Permission::EditCollectionQualityLabels,
            ContentType::Bundle => Permission::EditBundleQualityLabels,
        }
    }
}

/// The user performing an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub profile_id: Uuid,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub permissions: HashSet<Permission>,
}

impl Actor {
    pub fn new(profile_id: Uuid) -> Self {
        Self {
            profile_id,
            display_name: None,
            permissions: HashSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Whether this actor may edit `collection`.
    pub fn can_edit(&self, collection: &Collection) -> bool {
        let (own, any) = match collection.content_type {
            ContentType::Collection => (
                Permission::EditOwnCollections,
                Permission::EditAnyCollections,
            ),
            ContentType::Bundle => (Permission::EditOwnBundles, Permission::EditAnyBundles),
        };
        self.has(any) || (self.has(own) && collection.owner_profile_id == Some(self.profile_id))
    }
}

// =============================================================================
// SHARING & LOCKS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContributorRight {
    Viewer,
    Contributor,
    Owner,
}

/// A profile (or pending e-mail invite) a collection is shared with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub profile_id: Option<Uuid>,
    #[serde(default)]
    pub email: Option<String>,
    pub rights: ContributorRight,
}

/// An edit lock held on a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLock {
    pub collection_id: Uuid,
    pub profile_id: Uuid,
    #[serde(default)]
    pub holder_name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_id_decodes_placeholders_as_unsaved() {
        for raw in ["null", "-1", "-42", "0", "-0", "-0.0", "0.5"] {
            let id: FragmentId = serde_json::from_str(raw).unwrap();
            assert_eq!(id, FragmentId::Unsaved, "raw id {} should be unsaved", raw);
        }
    }

    #[test]
    fn test_fragment_id_decodes_positive_as_saved() {
        let id: FragmentId = serde_json::from_str("101").unwrap();
        assert_eq!(id, FragmentId::Saved(101));
        let id: FragmentId = serde_json::from_str("7.0").unwrap();
        assert_eq!(id, FragmentId::Saved(7));
    }

    #[test]
    fn test_fragment_id_negative_zero_float() {
        assert_eq!(FragmentId::from_f64(-0.0), FragmentId::Unsaved);
        assert_eq!(FragmentId::from_f64(f64::NAN), FragmentId::Unsaved);
        assert_eq!(FragmentId::from_f64(3.0), FragmentId::Saved(3));
    }

    #[test]
    fn test_fragment_id_serializes_unsaved_as_null() {
        assert_eq!(serde_json::to_string(&FragmentId::Unsaved).unwrap(), "null");
        assert_eq!(serde_json::to_string(&FragmentId::Saved(5)).unwrap(), "5");
    }

    #[test]
    fn test_fragment_missing_id_defaults_to_unsaved() {
        let json = r#"{"type": "TEXT", "custom_title": "Intro"}"#;
        let fragment: Fragment = serde_json::from_str(json).unwrap();
        assert_eq!(fragment.id, FragmentId::Unsaved);
        assert_eq!(fragment.kind, FragmentKind::Text);
        assert_eq!(fragment.position, 0);
    }

    #[test]
    fn test_fragment_to_insert_strips_item_meta_and_id() {
        let collection_id = Uuid::new_v4();
        let fragment = Fragment::item("abc123")
            .with_id(9)
            .with_item_meta(ItemMeta {
                external_id: "abc123".to_string(),
                thumbnail_path: Some("/thumb.jpg".to_string()),
                ..Default::default()
            });

        let insert = fragment.to_insert(collection_id);
        let json = serde_json::to_value(&insert).unwrap();

        assert_eq!(insert.collection_uuid, collection_id);
        assert!(json.get("item_meta").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["type"], "ITEM");
    }

    #[test]
    fn test_stored_now_survives_microsecond_storage() {
        let now = stored_now();
        let reparsed: DateTime<Utc> = now
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
            .parse()
            .unwrap();
        assert_eq!(now, reparsed);
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_collection_core_ignores_bookkeeping() {
        let owner = Uuid::new_v4();
        let a = Collection::new("Title", ContentType::Collection, owner);
        let mut b = a.clone();
        b.updated_at = Utc::now() + chrono::Duration::hours(1);
        b.labels.push("EXEMPLARY".to_string());
        b.fragments.push(Fragment::item("x"));
        assert_eq!(a.core(), b.core());

        b.title = "Other".to_string();
        assert_ne!(a.core(), b.core());
    }

    #[test]
    fn test_collection_deserializes_with_defaults() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "title": "Wereldoorlog II",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z",
            "type": "bundle",
            "fragments": [{"id": 5, "position": 1, "type": "COLLECTION", "external_id": "x"}]
        }"#;
        let collection: Collection = serde_json::from_str(json).unwrap();
        assert_eq!(collection.content_type, ContentType::Bundle);
        assert!(!collection.is_public);
        assert_eq!(collection.fragments[0].id, FragmentId::Saved(5));
    }

    #[test]
    fn test_latest_checks_keeps_last_entry_per_kind() {
        let entry = |kind, status| QualityCheckEntry {
            kind,
            status: Some(status),
            assignee_profile_id: None,
            comment: None,
            created_at: None,
        };
        let management = CollectionManagement {
            quality_checks: vec![
                entry(QualityCheckKind::LanguageCheck, false),
                entry(QualityCheckKind::QualityCheck, true),
                entry(QualityCheckKind::LanguageCheck, true),
            ],
            ..Default::default()
        };

        let latest = management.latest_checks();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].kind, QualityCheckKind::LanguageCheck);
        assert_eq!(latest[0].status, Some(true));
        assert_eq!(
            management
                .latest_check(QualityCheckKind::QualityCheck)
                .and_then(|e| e.status),
            Some(true)
        );
    }

    #[test]
    fn test_actor_can_edit_own_collection_only() {
        let owner = Uuid::new_v4();
        let collection = Collection::new("Mine", ContentType::Collection, owner);

        let me = Actor::new(owner).with_permission(Permission::EditOwnCollections);
        let other = Actor::new(Uuid::new_v4()).with_permission(Permission::EditOwnCollections);
        let editor = Actor::new(Uuid::new_v4()).with_permission(Permission::EditAnyCollections);

        assert!(me.can_edit(&collection));
        assert!(!other.can_edit(&collection));
        assert!(editor.can_edit(&collection));
    }

    #[test]
    fn test_actor_bundle_permissions_are_separate() {
        let owner = Uuid::new_v4();
        let bundle = Collection::new("Bundle", ContentType::Bundle, owner);
        let actor = Actor::new(owner).with_permission(Permission::EditOwnCollections);
        assert!(!actor.can_edit(&bundle));
    }

    #[test]
    fn test_content_type_from_str() {
        assert_eq!("Bundle".parse::<ContentType>(), Ok(ContentType::Bundle));
        assert!("assignment".parse::<ContentType>().is_err());
    }
}
