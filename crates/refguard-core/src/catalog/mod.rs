//! Schema catalog for refguard.
//!
//! The catalog holds the typed field declarations of every collection. It is
//! the only source of schema metadata the engine reads.

mod field;
mod registry;
mod schema;

pub use field::{FieldDef, FieldType};
pub use registry::Catalog;
pub use schema::{CollectionSchema, DEFAULT_IDENTITY_FIELD};
