//! Read-only reference diagnostics.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::Result;
use crate::reference::ReferenceValue;

use super::ReferenceGuard;

/// Outcome of checking one reference field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Checked field.
    pub field: String,
    /// Collection the field points at.
    pub target_collection: String,
    /// Value that was checked.
    pub value: ReferenceValue,
    /// Whether every identifier resolved.
    pub is_valid: bool,
}

impl ReferenceGuard {
    /// Check every present reference field of `data` without writing.
    ///
    /// Unlike the save hook this never aborts on the first dangling field:
    /// each present field gets a result, absent fields get none. Lookup
    /// failures still surface as `Error::Database`.
    pub async fn validate_references(
        &self,
        data: &Map<String, Value>,
    ) -> Result<Vec<ValidationResult>> {
        let validator = self.validator();
        let mut results = Vec::new();

        for field in &self.fields {
            let value = field.read(data);
            if value.is_absent() {
                continue;
            }

            let is_valid = validator
                .validate(&field.target_collection, &value, &field.field)
                .await?;
            results.push(ValidationResult {
                field: field.field.clone(),
                target_collection: field.target_collection.clone(),
                value,
                is_valid,
            });
        }

        Ok(results)
    }

    /// Check the reference fields of an existing document instance.
    pub async fn check_references(&self, document: &Document) -> Result<Vec<ValidationResult>> {
        self.validate_references(document.as_map()).await
    }
}
