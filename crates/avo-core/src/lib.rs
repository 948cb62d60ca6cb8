//! # avo-core
//!
//! Core types, traits, and reconciliation logic for AVO collections and
//! bundles.
//!
//! This crate provides the domain model, the backend ports, and the pure
//! parts of saving a collection (fragment classification, position
//! re-indexing, label diffing, validation) that the other avo crates
//! depend on.

pub mod defaults;
pub mod duplicate;
pub mod error;
pub mod labels;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use duplicate::{copy_title, duplicate_for};
pub use error::{Error, Result};
pub use labels::LabelCatalog;
pub use models::*;
pub use reconcile::{
    classify, diff_labels, ensure_unique_ids, plan_for, reindex_positions, FragmentPlan, LabelDiff,
};
pub use traits::*;
pub use validation::{ensure_valid, strip_html, validate, ValidationMode};
