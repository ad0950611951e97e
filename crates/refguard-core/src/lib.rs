//! Refguard Core - Referential integrity for schema-less document stores.
//!
//! This crate provides the reference engine: schema-driven extraction of
//! reference fields, existence validation on save and update, and
//! reverse-reference scans that block deletes which would orphan data.
//! Stores plug in through the [`DocumentStore`] trait and run guards
//! through a [`HookRegistry`].

pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod filter;
pub mod guard;
pub mod hook;
pub mod reference;
pub mod store;

#[cfg(test)]
mod test_support;

pub use catalog::{Catalog, CollectionSchema, FieldDef, FieldType};
pub use config::GuardConfig;
pub use document::{Document, DocumentId, UpdatePayload};
pub use error::{BackendError, Error, Result};
pub use filter::Filter;
pub use guard::{ReferenceGuard, ValidationResult};
pub use hook::{Hook, HookRegistry, Operation, OperationKind};
pub use reference::{ReferenceField, ReferenceValue, ReferencingCollection};
pub use store::DocumentStore;
