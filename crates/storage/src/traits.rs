//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of bytes for streaming reads.
pub type ByteStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Metadata about a stored object.
#[derive(Clone, Debug)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
}

/// Object store abstraction for archives and extracted assets.
///
/// Keys use `/` separators. Archives live under `uploads/{uploadId}/` and
/// extracted assets under `updates/{updateId}/`; the store itself is
/// layout-agnostic.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Get an object's size without fetching content.
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta>;

    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Get an object as a byte stream.
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream>;

    /// Put an object atomically.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all object keys under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the name of this storage backend ("filesystem", "s3").
    /// Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Delete every object under a prefix. Returns the number removed.
    async fn delete_prefix(&self, prefix: &str) -> StorageResult<u64> {
        let mut removed = 0;
        for key in self.list(prefix).await? {
            self.delete(&key).await?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Verify backend connectivity. Called once at startup, before the
    /// server starts accepting requests.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
