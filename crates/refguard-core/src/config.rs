//! Guard configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of identifiers counted per batch lookup.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Configuration captured when a guard is attached to a collection.
///
/// Deserializing from a partial document merges the supplied keys onto the
/// defaults, so `{"enable_delete": false}` only turns off delete protection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Validate references before save.
    pub enable_save: bool,
    /// Validate references in update payloads.
    pub enable_update: bool,
    /// Reject deletes of documents that are still referenced.
    pub enable_delete: bool,
    /// Emit a trace line for every check.
    pub enable_logging: bool,
    /// Maximum identifiers per existence count.
    pub batch_size: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            enable_save: true,
            enable_update: true,
            enable_delete: true,
            enable_logging: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl GuardConfig {
    /// Create a configuration with all checks enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable save validation.
    pub fn with_save(mut self, enabled: bool) -> Self {
        self.enable_save = enabled;
        self
    }

    /// Enable or disable update validation.
    pub fn with_update(mut self, enabled: bool) -> Self {
        self.enable_update = enabled;
        self
    }

    /// Enable or disable delete protection.
    pub fn with_delete(mut self, enabled: bool) -> Self {
        self.enable_delete = enabled;
        self
    }

    /// Enable or disable per-check logging.
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Parse a JSON override document, merging onto the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be positive".to_string()));
        }
        Ok(())
    }

    /// Check if no hook would be installed.
    pub fn is_inert(&self) -> bool {
        !self.enable_save && !self.enable_update && !self.enable_delete
    }
}
