//! Integration tests for the REST proxy client against a mock server.

use avo_core::{ContributorRepository, ContributorRight, EditLockProvider, Error};
use avo_graphql::{ProxyClient, ProxyConfig};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ProxyClient {
    ProxyClient::new(ProxyConfig {
        base_url: format!("{}/", server.uri()),
        token: Some("tok".to_string()),
        timeout_seconds: 5,
    })
    .expect("Failed to create proxy client")
}

#[tokio::test]
async fn test_acquire_edit_lock() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    let profile = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/collections/{}/edit-lock", id)))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "collection_id": id,
            "profile_id": profile,
            "holder_name": "Juf Anna",
            "expires_at": "2030-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let lock = client_for(&server).acquire_edit_lock(id).await.unwrap();
    assert_eq!(lock.collection_id, id);
    assert_eq!(lock.profile_id, profile);
}

#[tokio::test]
async fn test_acquire_edit_lock_held_by_someone_else() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/collections/{}/edit-lock", id)))
        .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
            "holder_name": "Meester Tom"
        })))
        .mount(&server)
        .await;

    match client_for(&server).acquire_edit_lock(id).await {
        Err(Error::Locked { id: locked, holder }) => {
            assert_eq!(locked, id);
            assert_eq!(holder, "Meester Tom");
        }
        other => panic!("expected Locked, got {:?}", other),
    }
}

#[tokio::test]
async fn test_release_expired_lock_is_ok() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path(format!("/collections/{}/edit-lock", id)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).release_edit_lock(id).await.unwrap();
}

#[tokio::test]
async fn test_forbidden_maps_to_forbidden() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/collections/{}/contributors", id)))
        .respond_with(ResponseTemplate::new(403).set_body_string("not yours"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_contributors(id).await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[tokio::test]
async fn test_add_contributor_posts_email_and_rights() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/collections/{}/contributors", id)))
        .and(body_partial_json(serde_json::json!({
            "email": "leraar@school.be",
            "rights": "CONTRIBUTOR"
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .add_contributor(id, " leraar@school.be ", ContributorRight::Contributor)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_contributor_rejects_owner_rights_locally() {
    let server = MockServer::start().await;

    let err = client_for(&server)
        .add_contributor(Uuid::new_v4(), "a@b.be", ContributorRight::Owner)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn test_fetch_collections_by_ids() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/collections/fetch-by-ids"))
        .and(body_partial_json(serde_json::json!({ "ids": [id] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
            "id": id,
            "title": "Klimaat",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "type": "collection"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let collections = client_for(&server)
        .fetch_collections_by_ids(&[id])
        .await
        .unwrap();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].title, "Klimaat");
}
