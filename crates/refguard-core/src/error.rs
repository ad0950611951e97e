//! Core error types.

use thiserror::Error;

/// Errors raised by the reference engine.
///
/// `ReferenceValidation`, `ReferentialIntegrity` and `Database` are the
/// three outcomes that abort an intercepted operation. The remaining
/// variants are raised while attaching or configuring a guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A reference field holds an identifier with no matching document.
    #[error(
        "invalid reference in {collection}.{field}: {value} does not exist in '{target_collection}'"
    )]
    ReferenceValidation {
        /// Collection of the document being written.
        collection: String,
        /// Offending reference field.
        field: String,
        /// Offending value, rendered as a string.
        value: String,
        /// Collection the field points at.
        target_collection: String,
    },

    /// A delete would orphan a living reference.
    #[error("cannot delete {collection} '{id}': still referenced in '{referencing_collection}'")]
    ReferentialIntegrity {
        /// Collection the document is being deleted from.
        collection: String,
        /// Identifier of the document being deleted.
        id: String,
        /// Collection holding the living reference.
        referencing_collection: String,
    },

    /// An underlying lookup failed.
    #[error("database error while checking '{context}': {message}")]
    Database {
        /// Field name or operation the lookup was made for.
        context: String,
        /// Message reported by the store.
        message: String,
    },

    /// Collection is not registered in the catalog.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// Invalid guard configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap a backend failure with the field or operation it happened in.
    pub fn database(context: impl Into<String>, source: BackendError) -> Self {
        Error::Database {
            context: context.into(),
            message: source.message,
        }
    }

    /// Check if this error aborts an operation because of a dangling or
    /// living reference (as opposed to an infrastructure failure).
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Error::ReferenceValidation { .. } | Error::ReferentialIntegrity { .. }
        )
    }
}

/// Failure reported by a [`DocumentStore`](crate::store::DocumentStore) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    /// Create a backend error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The backend's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ReferenceValidation {
            collection: "Post".to_string(),
            field: "author".to_string(),
            value: "u1".to_string(),
            target_collection: "User".to_string(),
        };
        assert!(err.to_string().contains("Post.author"));
        assert!(err.to_string().contains("'User'"));
        assert!(err.is_integrity_violation());

        let err = Error::ReferentialIntegrity {
            collection: "User".to_string(),
            id: "u1".to_string(),
            referencing_collection: "Post".to_string(),
        };
        assert!(err.to_string().contains("'u1'"));
        assert!(err.to_string().contains("'Post'"));
    }

    #[test]
    fn test_database_wraps_backend_message() {
        let err = Error::database("author", BackendError::new("connection reset"));
        assert_eq!(
            err,
            Error::Database {
                context: "author".to_string(),
                message: "connection reset".to_string(),
            }
        );
        assert!(!err.is_integrity_violation());
    }
}
