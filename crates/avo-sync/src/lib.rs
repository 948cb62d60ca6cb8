//! # avo-sync
//!
//! Persists edits to AVO collections and bundles.
//!
//! [`FragmentSynchronizer`] applies a fragment plan as concurrent insert,
//! update and delete batches. [`CollectionService`] wraps it with
//! validation, the version check, thumbnail derivation, and the row, label
//! and management writes that make up one save.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use avo_core::{Actor, ContentType, Permission, ValidationMode};
//! use avo_sync::{memory::InMemoryBackend, CollectionService};
//! use uuid::Uuid;
//!
//! # async fn example(initial: avo_core::Collection) -> avo_core::Result<()> {
//! let actor = Actor::new(Uuid::new_v4()).with_permission(Permission::EditAnyCollections);
//! let backend = Arc::new(InMemoryBackend::new().with_collection(initial.clone()));
//! let service = CollectionService::new(backend);
//!
//! let mut updated = initial.clone();
//! updated.title = "Klimaat en energie".to_string();
//! let outcome = service
//!     .update_collection(&initial, updated, &actor, Some(ValidationMode::Save), ContentType::Collection)
//!     .await?;
//! assert!(outcome.collection_written);
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod service;
pub mod synchronizer;

pub use memory::{BackendCall, InMemoryBackend};
pub use service::{CollectionService, UpdateOutcome};
pub use synchronizer::{FragmentSynchronizer, SyncReport};
