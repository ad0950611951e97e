//! Existence checks for reference values.

use crate::config::DEFAULT_BATCH_SIZE;
use crate::error::{Error, Result};
use crate::store::DocumentStore;

use super::value::ReferenceValue;

/// Checks that every identifier in a reference value resolves to a document.
pub struct ExistenceValidator<'a> {
    store: &'a dyn DocumentStore,
    batch_size: usize,
    logging: bool,
}

impl<'a> ExistenceValidator<'a> {
    /// Create a validator over `store` with the default batch size.
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            logging: false,
        }
    }

    /// Set the maximum identifiers per count query.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Trace every lookup.
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// Check `value` against `target_collection`.
    ///
    /// Absent values and empty arrays are valid. Arrays are deduplicated and
    /// valid only if every distinct identifier exists. Malformed values and
    /// missing documents are `Ok(false)`; a failed lookup is
    /// `Err(Error::Database)`.
    pub async fn validate(
        &self,
        target_collection: &str,
        value: &ReferenceValue,
        field: &str,
    ) -> Result<bool> {
        let valid = match value {
            ReferenceValue::Absent => return Ok(true),
            ReferenceValue::Malformed(_) => false,
            ReferenceValue::Single(id) => self
                .store
                .exists_by_id(target_collection, id)
                .await
                .map_err(|e| Error::database(field, e))?,
            ReferenceValue::Many(_) => {
                let unique = value.unique_ids();
                if unique.is_empty() {
                    return Ok(true);
                }

                let mut valid = true;
                for chunk in unique.chunks(self.batch_size) {
                    let found = self
                        .store
                        .count_by_ids(target_collection, chunk)
                        .await
                        .map_err(|e| Error::database(field, e))?;
                    if found != chunk.len() as u64 {
                        valid = false;
                        break;
                    }
                }
                valid
            }
        };

        if self.logging {
            tracing::debug!(
                field,
                target_collection,
                value = %value,
                valid,
                "checked reference"
            );
        }

        Ok(valid)
    }
}
