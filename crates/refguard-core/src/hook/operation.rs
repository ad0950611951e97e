//! Intercepted operations.

use std::fmt;

use crate::document::{Document, UpdatePayload};
use crate::filter::Filter;

/// Kind of a write operation that hooks can intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Insert or replace a single document.
    Save,
    /// Update the first match and return it.
    FindOneAndUpdate,
    /// Update the first match.
    UpdateOne,
    /// Update every match.
    UpdateMany,
    /// Delete the first match.
    DeleteOne,
    /// Delete the first match and return it.
    FindOneAndDelete,
    /// Delete every match.
    DeleteMany,
}

impl OperationKind {
    /// All update-family kinds.
    pub const UPDATE_KINDS: [OperationKind; 3] = [
        OperationKind::FindOneAndUpdate,
        OperationKind::UpdateOne,
        OperationKind::UpdateMany,
    ];

    /// All delete-family kinds.
    pub const DELETE_KINDS: [OperationKind; 3] = [
        OperationKind::DeleteOne,
        OperationKind::FindOneAndDelete,
        OperationKind::DeleteMany,
    ];

    /// Check if this is an update-family kind.
    pub fn is_update(self) -> bool {
        Self::UPDATE_KINDS.contains(&self)
    }

    /// Check if this is a delete-family kind.
    pub fn is_delete(self) -> bool {
        Self::DELETE_KINDS.contains(&self)
    }

    /// Check if the operation may affect more than one document.
    pub fn is_multi(self) -> bool {
        matches!(self, OperationKind::UpdateMany | OperationKind::DeleteMany)
    }

    /// Operation name as used in logs and error context.
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::Save => "save",
            OperationKind::FindOneAndUpdate => "findOneAndUpdate",
            OperationKind::UpdateOne => "updateOne",
            OperationKind::UpdateMany => "updateMany",
            OperationKind::DeleteOne => "deleteOne",
            OperationKind::FindOneAndDelete => "findOneAndDelete",
            OperationKind::DeleteMany => "deleteMany",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pending write, as seen by hooks before it is applied.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// A document about to be persisted.
    Save {
        /// Target collection.
        collection: &'a str,
        /// The full document being saved.
        document: &'a Document,
    },
    /// An update about to be applied to the documents matching `filter`.
    Update {
        /// Update-family kind.
        kind: OperationKind,
        /// Target collection.
        collection: &'a str,
        /// Query criteria.
        filter: &'a Filter,
        /// Proposed changes.
        payload: &'a UpdatePayload,
    },
    /// A delete about to remove the documents matching `filter`.
    Delete {
        /// Delete-family kind.
        kind: OperationKind,
        /// Target collection.
        collection: &'a str,
        /// Query criteria.
        filter: &'a Filter,
    },
}

impl Operation<'_> {
    /// The operation's kind.
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Save { .. } => OperationKind::Save,
            Operation::Update { kind, .. } | Operation::Delete { kind, .. } => *kind,
        }
    }

    /// The collection being written.
    pub fn collection(&self) -> &str {
        match self {
            Operation::Save { collection, .. }
            | Operation::Update { collection, .. }
            | Operation::Delete { collection, .. } => collection,
        }
    }
}
