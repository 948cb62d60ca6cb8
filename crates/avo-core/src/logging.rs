//! Structured logging field name constants for AVO crates.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query by the same names across subsystems.
//! `tracing` takes them as braced field names:
//!
//! ```rust
//! use avo_core::logging::{COLLECTION_ID, OPERATION};
//!
//! let id = uuid::Uuid::nil();
//! tracing::info!({ OPERATION } = "update_collection", { COLLECTION_ID } = %id, "Collection saved");
//! ```
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A save failed and the user must be told |
//! | WARN  | Recoverable anomaly, operation skipped a step |
//! | INFO  | Operation completions (collection saved, duplicated, deleted) |
//! | DEBUG | Decision points (plan sizes, skipped writes, permission drops) |
//! | TRACE | Per-fragment iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "graphql", "proxy", "sync", "cli"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "hasura", "synchronizer", "collection_service"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "update_collection", "insert_fragments", "acquire_edit_lock"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Collection (or bundle) UUID being operated on.
pub const COLLECTION_ID: &str = "collection_id";

/// Fragment id being operated on.
pub const FRAGMENT_ID: &str = "fragment_id";

/// Acting profile id.
pub const PROFILE_ID: &str = "profile_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of fragments inserted.
pub const INSERT_COUNT: &str = "insert_count";

/// Number of fragments updated.
pub const UPDATE_COUNT: &str = "update_count";

/// Number of fragments deleted.
pub const DELETE_COUNT: &str = "delete_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
