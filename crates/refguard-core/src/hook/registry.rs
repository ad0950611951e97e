//! Per-collection hook registration and dispatch.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

use super::operation::{Operation, OperationKind};

/// Logic run before an operation is applied.
///
/// Returning an error aborts the operation; nothing is written.
#[async_trait]
pub trait Hook: Send + Sync {
    /// Inspect a pending operation.
    async fn before(&self, operation: &Operation<'_>) -> Result<()>;
}

#[derive(Clone)]
struct HookEntry {
    kinds: Vec<OperationKind>,
    hook: Arc<dyn Hook>,
}

/// Hooks installed on one collection.
///
/// Cheap to clone, so a pipeline can take a snapshot and run it without
/// holding any lock across awaits.
#[derive(Clone, Default)]
pub struct HookRegistry {
    entries: Vec<HookEntry>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` before every operation of the given kinds.
    pub fn before_operation(&mut self, kinds: &[OperationKind], hook: Arc<dyn Hook>) {
        self.entries.push(HookEntry {
            kinds: kinds.to_vec(),
            hook,
        });
    }

    /// Check if any hook intercepts `kind`.
    pub fn intercepts(&self, kind: OperationKind) -> bool {
        self.entries.iter().any(|e| e.kinds.contains(&kind))
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run matching hooks in registration order, stopping at the first error.
    pub async fn run_before(&self, operation: &Operation<'_>) -> Result<()> {
        let kind = operation.kind();
        for entry in self.entries.iter().filter(|e| e.kinds.contains(&kind)) {
            entry.hook.before(operation).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.kinds))
            .finish()
    }
}
