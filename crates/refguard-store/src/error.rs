//! Store error types.

use thiserror::Error;

/// Errors raised by the document store.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Document or schema encoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A before-operation hook rejected the operation. Nothing was written.
    #[error("operation aborted: {0}")]
    Aborted(refguard_core::Error),

    /// Attaching a guard or running a manual check failed.
    #[error("guard error: {0}")]
    Guard(refguard_core::Error),

    /// Collection is not registered.
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// Collection has no reference guard attached.
    #[error("no reference guard attached to '{0}'")]
    NotGuarded(String),

    /// Document is not a JSON object.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Document not found.
    #[error("document not found")]
    NotFound,
}

impl Error {
    /// The engine error behind an aborted operation, if any.
    pub fn abort_reason(&self) -> Option<&refguard_core::Error> {
        match self {
            Error::Aborted(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
