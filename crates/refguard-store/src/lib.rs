//! Refguard Store - Embedded document store with guarded write pipelines.
//!
//! Collections are stored in sled trees as JSON documents. Each collection
//! can carry a [`ReferenceGuard`](refguard_core::ReferenceGuard) whose hooks
//! run before saves, updates and deletes.

pub mod collection;
pub mod config;
pub mod database;
pub mod engine;
pub mod error;

pub use collection::Collection;
pub use config::StoreConfig;
pub use database::Database;
pub use engine::StorageEngine;
pub use error::{Error, Result};
