//! Operation interception.

mod operation;
mod registry;

pub use operation::{Operation, OperationKind};
pub use registry::{Hook, HookRegistry};
