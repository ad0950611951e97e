//! Reference validation engine.
//!
//! - Extraction of reference fields from schema declarations
//! - Existence checks for scalar and array references
//! - Reverse-reference scans before deletes

mod extractor;
mod scanner;
mod validator;
mod value;

pub use extractor::{extract, ReferenceField};
pub use scanner::{
    has_living_reference, scan_referencing_collections, LivingReference, ReferencingCollection,
    ReverseScanner,
};
pub use validator::ExistenceValidator;
pub use value::ReferenceValue;
