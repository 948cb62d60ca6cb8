//! # avo-graphql
//!
//! Network backends for AVO collections.
//!
//! This crate provides:
//! - [`HasuraClient`]: GraphQL client implementing the fragment, collection,
//!   label, management and item ports of `avo_core`
//! - [`ProxyClient`]: REST proxy client for edit locks, contributors and
//!   bulk fetch by id
//!
//! # Example
//!
//! ```rust,no_run
//! use avo_core::CollectionRepository;
//! use avo_graphql::HasuraClient;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = HasuraClient::from_env().unwrap();
//!     let collection = client.fetch(uuid::Uuid::nil()).await.unwrap();
//! }
//! ```

pub mod client;
pub mod config;
pub mod proxy;
pub mod queries;
pub mod repository;

pub use client::HasuraClient;
pub use config::{GraphQlConfig, ProxyConfig};
pub use proxy::ProxyClient;
pub use repository::{qc_label, type_id};
