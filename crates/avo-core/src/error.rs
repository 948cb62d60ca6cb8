//! Error types for AVO collection operations.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using avo-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for AVO collection operations.
#[derive(Error, Debug)]
pub enum Error {
    /// One or more validation rules failed. Every violated rule is listed.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Collection not found
    #[error("Collection not found: {0}")]
    CollectionNotFound(Uuid),

    /// The collection changed on the server since it was loaded.
    #[error("Conflict: collection {id} was updated at {server} but the edit started from {base}")]
    Conflict {
        id: Uuid,
        base: String,
        server: String,
    },

    /// Another profile holds the edit lock.
    #[error("Collection {id} is locked for editing by {holder}")]
    Locked { id: Uuid, holder: String },

    /// A backend mutation or query failed.
    #[error("Backend error during {op} (ids: {ids}): {message}")]
    Backend {
        op: &'static str,
        ids: String,
        message: String,
    },

    /// The GraphQL endpoint returned an `errors` payload.
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Authenticated but not authorized
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a lower-level error with the backend operation and ids it concerned.
    pub fn backend(
        op: &'static str,
        ids: impl std::fmt::Display,
        source: impl std::fmt::Display,
    ) -> Self {
        Error::Backend {
            op,
            ids: ids.to_string(),
            message: source.to_string(),
        }
    }

    /// Validation messages, if this is a validation failure.
    pub fn validation_messages(&self) -> Option<&[String]> {
        match self {
            Error::Validation(msgs) => Some(msgs),
            _ => None,
        }
    }
}

/// Render a list of ids for error context, e.g. `[5, 7]`.
pub fn format_ids<T: std::fmt::Display>(ids: &[T]) -> String {
    let parts: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_lists_every_message() {
        let err = Error::Validation(vec!["no title".to_string(), "no items".to_string()]);
        assert_eq!(err.to_string(), "Validation failed: no title; no items");
    }

    #[test]
    fn test_validation_messages_accessor() {
        let err = Error::Validation(vec!["a".to_string()]);
        assert_eq!(err.validation_messages(), Some(&["a".to_string()][..]));
        assert!(Error::NotFound("x".to_string()).validation_messages().is_none());
    }

    #[test]
    fn test_backend_error_carries_op_and_ids() {
        let err = Error::backend("delete_fragment", format_ids(&[5, 7]), "timeout");
        assert_eq!(
            err.to_string(),
            "Backend error during delete_fragment (ids: [5, 7]): timeout"
        );
    }

    #[test]
    fn test_conflict_display() {
        let id = Uuid::nil();
        let err = Error::Conflict {
            id,
            base: "a".to_string(),
            server: "b".to_string(),
        };
        assert!(err.to_string().contains(&id.to_string()));
        assert!(err.to_string().starts_with("Conflict:"));
    }

    #[test]
    fn test_locked_display() {
        let err = Error::Locked {
            id: Uuid::nil(),
            holder: "Jan".to_string(),
        };
        assert!(err.to_string().contains("locked for editing by Jan"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_format_ids_empty() {
        let ids: [i64; 0] = [];
        assert_eq!(format_ids(&ids), "[]");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
