//! GraphQL documents sent to Hasura.

pub const GET_COLLECTION_BY_ID: &str = r#"
query getCollectionById($id: uuid!) {
  app_collections_by_pk(id: $id) {
    id
    title
    description
    description_long
    is_public
    owner_profile_id
    created_at
    updated_at
    updated_by_profile_id
    thumbnail_path
    type_id
    lom_context
    lom_classification
    collection_labels {
      label
    }
    management {
      current_status
      manager_profile_id
      status_valid_until
      note
    }
    management_quality_check(order_by: { created_at: asc }) {
      qc_label
      qc_status
      assignee_profile_id
      comment
      created_at
    }
    collection_fragments(order_by: { position: asc }) {
      id
      position
      type
      external_id
      use_custom_fields
      custom_title
      custom_description
      start_oc
      end_oc
      item_meta {
        external_id
        title
        description
        thumbnail_path
      }
    }
  }
}
"#;

pub const GET_COLLECTION_UPDATED_AT: &str = r#"
query getCollectionUpdatedAt($id: uuid!) {
  app_collections_by_pk(id: $id) {
    updated_at
  }
}
"#;

pub const GET_COLLECTION_TITLES_BY_OWNER: &str = r#"
query getCollectionTitlesByOwner($owner: uuid!, $typeId: Int!) {
  app_collections(where: { owner_profile_id: { _eq: $owner }, type_id: { _eq: $typeId } }) {
    title
  }
}
"#;

pub const INSERT_COLLECTION: &str = r#"
mutation insertCollection($collection: app_collections_insert_input!) {
  insert_app_collections(objects: [$collection]) {
    returning {
      id
    }
  }
}
"#;

pub const UPDATE_COLLECTION: &str = r#"
mutation updateCollectionById($id: uuid!, $collection: app_collections_set_input!) {
  update_app_collections(where: { id: { _eq: $id } }, _set: $collection) {
    affected_rows
  }
}
"#;

pub const DELETE_COLLECTION: &str = r#"
mutation deleteCollectionById($id: uuid!) {
  delete_app_collection_fragments(where: { collection_uuid: { _eq: $id } }) {
    affected_rows
  }
  delete_app_collections(where: { id: { _eq: $id } }) {
    affected_rows
  }
}
"#;

pub const INSERT_FRAGMENTS: &str = r#"
mutation insertCollectionFragments($fragments: [app_collection_fragments_insert_input!]!) {
  insert_app_collection_fragments(objects: $fragments) {
    returning {
      id
    }
  }
}
"#;

pub const UPDATE_FRAGMENT: &str = r#"
mutation updateCollectionFragmentById($id: Int!, $fragment: app_collection_fragments_set_input!) {
  update_app_collection_fragments(where: { id: { _eq: $id } }, _set: $fragment) {
    affected_rows
  }
}
"#;

pub const DELETE_FRAGMENT: &str = r#"
mutation deleteCollectionFragmentById($id: Int!) {
  delete_app_collection_fragments(where: { id: { _eq: $id } }) {
    affected_rows
  }
}
"#;

pub const GET_QUALITY_LABELS: &str = r#"
query getCollectionQualityLabels {
  lookup_enum_collection_labels {
    value
    description
  }
}
"#;

pub const INSERT_COLLECTION_LABELS: &str = r#"
mutation insertCollectionLabels($objects: [app_collection_labels_insert_input!]!) {
  insert_app_collection_labels(objects: $objects) {
    affected_rows
  }
}
"#;

pub const DELETE_COLLECTION_LABELS: &str = r#"
mutation deleteCollectionLabels($collectionId: uuid!, $labels: [String!]!) {
  delete_app_collection_labels(
    where: { collection_uuid: { _eq: $collectionId }, label: { _in: $labels } }
  ) {
    affected_rows
  }
}
"#;

pub const INSERT_MANAGEMENT: &str = r#"
mutation insertCollectionManagement($management: app_collection_management_insert_input!) {
  insert_app_collection_management(objects: [$management]) {
    affected_rows
  }
}
"#;

pub const UPDATE_MANAGEMENT: &str = r#"
mutation updateCollectionManagement($collectionId: uuid!, $management: app_collection_management_set_input!) {
  update_app_collection_management(where: { collection_id: { _eq: $collectionId } }, _set: $management) {
    affected_rows
  }
}
"#;

pub const INSERT_QUALITY_CHECK: &str = r#"
mutation insertCollectionQualityCheck($entry: app_collection_management_QC_insert_input!) {
  insert_app_collection_management_QC_one(object: $entry) {
    id
  }
}
"#;

pub const GET_ITEM_THUMBNAIL: &str = r#"
query getItemThumbnail($externalId: bpchar!) {
  app_item_meta(where: { external_id: { _eq: $externalId } }, limit: 1) {
    thumbnail_path
  }
}
"#;
