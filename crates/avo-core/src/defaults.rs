//! Centralized default constants for AVO collection handling.
//!
//! Every crate references these constants instead of defining its own
//! magic numbers.

// =============================================================================
// VALIDATION
// =============================================================================

/// Maximum length (in characters) of a collection's short description.
pub const MAX_DESCRIPTION_LENGTH: usize = 300;

// =============================================================================
// DUPLICATION
// =============================================================================

/// Prefix template for duplicated collection titles. `{n}` is the copy number.
pub const COPY_TITLE_TEMPLATE: &str = "Kopie {n}: ";

// =============================================================================
// HTTP
// =============================================================================

/// Default GraphQL endpoint (Hasura).
pub const GRAPHQL_URL: &str = "http://localhost:8080/v1/graphql";

/// Default REST proxy endpoint.
pub const PROXY_URL: &str = "http://localhost:3000";

/// Timeout for backend requests (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// CACHING
// =============================================================================

/// How long the quality-label vocabulary stays cached (seconds).
pub const LABEL_CACHE_TTL_SECS: u64 = 3600;
