//! Metadata store abstraction and implementations for updraft.
//!
//! This crate provides the control-plane data model:
//! - Registered apps with optional signing keypairs
//! - Uploads and their release state machine
//! - Aggregate statistics for the app registry

pub mod error;
pub mod models;
pub mod repos;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use repos::{AppRepo, UploadRepo};
pub use store::{MetadataStore, SqliteStore};

use std::sync::Arc;
use updraft_core::config::MetadataConfig;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    match config {
        MetadataConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn MetadataStore>)
        }
    }
}
