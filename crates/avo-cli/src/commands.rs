//! Command implementations. Each prints its result as pretty JSON on stdout.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use avo_core::{
    diff_labels, plan_for, reindex_positions, validate, Actor, CollectionRepository,
    ContributorRepository, ContributorRight, EditLockProvider, ValidationMode,
};
use avo_graphql::{HasuraClient, ProxyClient};
use avo_sync::{CollectionService, InMemoryBackend};

use crate::input::read_collection;

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn hasura_service() -> anyhow::Result<CollectionService<HasuraClient>> {
    Ok(CollectionService::new(Arc::new(HasuraClient::from_env()?)))
}

pub fn validate_file(path: &Path, mode: ValidationMode) -> anyhow::Result<ExitCode> {
    let collection = read_collection(path)?;
    let messages = validate(&collection, mode);

    print_json(&json!({
        "valid": messages.is_empty(),
        "mode": mode,
        "messages": messages,
    }))?;

    Ok(if messages.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Show what a save would do, without contacting a backend.
pub fn plan(initial: &Path, updated: &Path) -> anyhow::Result<()> {
    let initial = read_collection(initial)?;
    let mut updated = read_collection(updated)?;
    if initial.id != updated.id {
        bail!(
            "snapshots belong to different collections: {} and {}",
            initial.id,
            updated.id
        );
    }

    reindex_positions(&mut updated.fragments);
    let fragments = plan_for(&initial, &updated);
    let labels = diff_labels(&initial.labels, &updated.labels);

    print_json(&json!({
        "fragments": fragments,
        "labels": labels,
        "core_changed": initial.core() != updated.core(),
    }))
}

pub async fn update(
    initial: &Path,
    updated: &Path,
    actor: &Actor,
    mode: Option<ValidationMode>,
    dry_run: bool,
    lock: bool,
) -> anyhow::Result<()> {
    let initial = read_collection(initial)?;
    let updated = read_collection(updated)?;
    let content_type = updated.content_type;

    if dry_run {
        let backend = Arc::new(
            InMemoryBackend::new()
                .with_collection(initial.clone())
                .with_session(actor.profile_id, actor.display_name.as_deref()),
        );
        let service = CollectionService::new(Arc::clone(&backend));
        let outcome = service
            .update_collection(&initial, updated, actor, mode, content_type)
            .await?;
        return print_json(&json!({
            "outcome": outcome,
            "writes": backend.writes(),
        }));
    }

    let service = hasura_service()?;
    let outcome = if lock {
        let proxy = ProxyClient::from_env()?;
        service
            .update_with_lock(&proxy, &initial, updated, actor, mode, content_type)
            .await?
    } else {
        service
            .update_collection(&initial, updated, actor, mode, content_type)
            .await?
    };
    print_json(&outcome)
}

pub async fn fetch(ids: &[Uuid]) -> anyhow::Result<()> {
    match ids {
        [] => bail!("no collection ids given"),
        [id] => {
            let collection = HasuraClient::from_env()?
                .fetch(*id)
                .await?
                .ok_or_else(|| anyhow!("Collection {} not found", id))?;
            print_json(&collection)
        }
        _ => {
            let collections = ProxyClient::from_env()?
                .fetch_collections_by_ids(ids)
                .await?;
            print_json(&collections)
        }
    }
}

pub async fn duplicate(id: Uuid, actor: &Actor) -> anyhow::Result<()> {
    let service = hasura_service()?;
    let source = service
        .backend()
        .fetch(id)
        .await?
        .ok_or_else(|| anyhow!("Collection {} not found", id))?;

    let copy = service.duplicate_collection(&source, actor).await?;
    info!(source = %id, copy = %copy.id, "Collection duplicated");
    print_json(&copy)
}

pub async fn delete(id: Uuid, actor: &Actor) -> anyhow::Result<()> {
    hasura_service()?.delete_collection(id, actor).await?;
    print_json(&json!({ "deleted": id }))
}

pub async fn lock(id: Uuid) -> anyhow::Result<()> {
    let lock = ProxyClient::from_env()?.acquire_edit_lock(id).await?;
    print_json(&lock)
}

pub async fn unlock(id: Uuid) -> anyhow::Result<()> {
    ProxyClient::from_env()?.release_edit_lock(id).await?;
    print_json(&json!({ "released": id }))
}

pub async fn labels() -> anyhow::Result<()> {
    let labels = hasura_service()?.quality_labels().await?;
    print_json(&labels)
}

pub async fn list_contributors(id: Uuid) -> anyhow::Result<()> {
    let contributors = ProxyClient::from_env()?.list_contributors(id).await?;
    print_json(&contributors)
}

pub async fn add_contributor(id: Uuid, email: &str, rights: ContributorRight) -> anyhow::Result<()> {
    ProxyClient::from_env()?
        .add_contributor(id, email, rights)
        .await?;
    print_json(&json!({ "collection_id": id, "email": email.trim(), "rights": rights }))
}

pub async fn remove_contributor(id: Uuid, contributor_id: Uuid) -> anyhow::Result<()> {
    ProxyClient::from_env()?
        .remove_contributor(id, contributor_id)
        .await?;
    print_json(&json!({ "collection_id": id, "removed": contributor_id }))
}
