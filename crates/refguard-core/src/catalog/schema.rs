//! Collection schema descriptors.

use serde::{Deserialize, Serialize};

use super::field::FieldDef;

/// Default identity field for documents.
pub const DEFAULT_IDENTITY_FIELD: &str = "_id";

fn default_identity_field() -> String {
    DEFAULT_IDENTITY_FIELD.to_string()
}

/// Field declarations for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    /// Collection name (unique within a catalog).
    pub name: String,
    /// Name of the identity field.
    #[serde(default = "default_identity_field")]
    pub identity_field: String,
    /// Declared fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl CollectionSchema {
    /// Create an empty schema identified by `_id`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: default_identity_field(),
            fields: Vec::new(),
        }
    }

    /// Override the identity field.
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_builder() {
        let post = CollectionSchema::new("Post")
            .with_field(FieldDef::scalar("title"))
            .with_field(FieldDef::reference("author", "User"));

        assert_eq!(post.identity_field, "_id");
        assert_eq!(post.fields.len(), 2);
        assert!(post.get_field("author").unwrap().is_reference());
        assert!(post.get_field("missing").is_none());
    }

    #[test]
    fn test_identity_field_defaults_when_deserializing() {
        let schema: CollectionSchema = serde_json::from_str(r#"{"name": "User"}"#).unwrap();
        assert_eq!(schema.identity_field, DEFAULT_IDENTITY_FIELD);
        assert!(schema.fields.is_empty());
    }
}
