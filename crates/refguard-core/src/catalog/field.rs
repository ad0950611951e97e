//! Field declarations for collection schemas.

use serde::{Deserialize, Serialize};

use super::schema::CollectionSchema;

/// Shape of a declared field.
///
/// Nesting is limited to subdocuments: a structured element type carries its
/// own [`CollectionSchema`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "schema")]
pub enum FieldType {
    /// A single value.
    #[default]
    Scalar,
    /// An array of values.
    Array,
    /// A single embedded subdocument.
    Embedded(CollectionSchema),
    /// An array of embedded subdocuments.
    ArrayEmbedded(CollectionSchema),
}

impl FieldType {
    /// Check if this type is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::Array | FieldType::ArrayEmbedded(_))
    }

    /// Get the schema of the subdocument, or of each array element.
    pub fn subdocument_schema(&self) -> Option<&CollectionSchema> {
        match self {
            FieldType::Embedded(schema) | FieldType::ArrayEmbedded(schema) => Some(schema),
            FieldType::Scalar | FieldType::Array => None,
        }
    }
}

/// A field declaration within a collection schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field shape.
    #[serde(default)]
    pub field_type: FieldType,
    /// Target collection when the field holds document identifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    /// Whether the field must be present. Enforced by the schema layer, not
    /// by reference validation.
    #[serde(default)]
    pub required: bool,
}

impl FieldDef {
    /// Create an optional field of the given shape.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            references: None,
            required: false,
        }
    }

    /// Create a plain scalar field.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Scalar)
    }

    /// Create a field holding one identifier from `target`.
    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldType::Scalar).with_reference(target)
    }

    /// Create a field holding an array of identifiers from `target`.
    pub fn reference_array(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, FieldType::Array).with_reference(target)
    }

    /// Create a single subdocument described by `schema`.
    pub fn embedded(name: impl Into<String>, schema: CollectionSchema) -> Self {
        Self::new(name, FieldType::Embedded(schema))
    }

    /// Create an array of subdocuments described by `schema`.
    pub fn embedded_array(name: impl Into<String>, schema: CollectionSchema) -> Self {
        Self::new(name, FieldType::ArrayEmbedded(schema))
    }

    /// Annotate the field as a reference to `target`.
    pub fn with_reference(mut self, target: impl Into<String>) -> Self {
        self.references = Some(target.into());
        self
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Check if the field carries a reference-target annotation.
    pub fn is_reference(&self) -> bool {
        self.references.is_some()
    }
}
