//! Reference field discovery from schema declarations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::CollectionSchema;

use super::value::ReferenceValue;

/// A field declared to hold identifiers of another collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceField {
    /// Top-level field name. For references nested in subdocuments this is
    /// the outer field.
    pub field: String,
    /// Collection the identifiers belong to.
    pub target_collection: String,
    /// Reference field inside the subdocument or each array element, when
    /// nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_field: Option<String>,
}

impl ReferenceField {
    /// Create a top-level reference field.
    pub fn new(field: impl Into<String>, target_collection: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            target_collection: target_collection.into(),
            element_field: None,
        }
    }

    /// Create a reference nested in a subdocument or an array of them.
    pub fn nested(
        field: impl Into<String>,
        element_field: impl Into<String>,
        target_collection: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            target_collection: target_collection.into(),
            element_field: Some(element_field.into()),
        }
    }

    /// Dotted path to the identifiers, as used in store queries.
    pub fn path(&self) -> String {
        match &self.element_field {
            Some(inner) => format!("{}.{}", self.field, inner),
            None => self.field.clone(),
        }
    }

    /// Read this field's value out of document data or payload assignments.
    ///
    /// Nested references are gathered from every element of the outer
    /// array; elements without the inner field are skipped, and an array
    /// where no element carries it reads as absent.
    pub fn read(&self, data: &Map<String, Value>) -> ReferenceValue {
        let outer = data.get(&self.field);
        let Some(inner) = &self.element_field else {
            return ReferenceValue::from_json(outer);
        };

        match outer {
            None | Some(Value::Null) => ReferenceValue::Absent,
            Some(Value::Array(elements)) => {
                let mut ids = Vec::new();
                let mut present = false;
                for element in elements {
                    match ReferenceValue::from_json(element.get(inner)) {
                        ReferenceValue::Absent => {}
                        ReferenceValue::Single(id) => {
                            present = true;
                            ids.push(id);
                        }
                        ReferenceValue::Many(many) => {
                            present = true;
                            ids.extend(many);
                        }
                        ReferenceValue::Malformed(_) => {
                            return ReferenceValue::Malformed(Value::Array(elements.clone()))
                        }
                    }
                }
                if present {
                    ReferenceValue::Many(ids)
                } else {
                    ReferenceValue::Absent
                }
            }
            Some(Value::Object(element)) => ReferenceValue::from_json(element.get(inner)),
            Some(other) => ReferenceValue::Malformed(other.clone()),
        }
    }

    /// Check if the field points at `collection`.
    pub fn targets(&self, collection: &str) -> bool {
        self.target_collection == collection
    }
}

/// List every reference field declared by `schema`.
///
/// Subdocument and array-of-subdocument fields are searched one level deep;
/// each nested reference is reported under the outer field's name.
pub fn extract(schema: &CollectionSchema) -> Vec<ReferenceField> {
    let mut references = Vec::new();

    for field in &schema.fields {
        if let Some(target) = &field.references {
            references.push(ReferenceField::new(field.name.as_str(), target.as_str()));
        }

        if let Some(element) = field.field_type.subdocument_schema() {
            for nested in &element.fields {
                if let Some(target) = &nested.references {
                    references.push(ReferenceField::nested(
                        field.name.as_str(),
                        nested.name.as_str(),
                        target.as_str(),
                    ));
                }
            }
        }
    }

    references
}
