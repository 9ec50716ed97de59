//! Local filesystem storage backend.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ByteStream, ObjectMeta, ObjectStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Chunk size for streaming reads (64 KiB).
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem object store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Resolve a key to a path under the root, rejecting traversal attempts.
    fn key_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        if key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {key}"
            )));
        }
        // Every component must be a plain name (no roots, no `.`/`..`).
        for component in Path::new(key).components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(StorageError::InvalidKey(format!(
                        "unsafe path component: {key}"
                    )));
                }
            }
        }
        Ok(self.root.join(key))
    }

    fn map_not_found(key: &str, e: std::io::Error) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_path(key)?;
        fs::try_exists(&path).await.map_err(StorageError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn head(&self, key: &str) -> StorageResult<ObjectMeta> {
        let path = self.key_path(key)?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| Self::map_not_found(key, e))?;
        Ok(ObjectMeta {
            size: metadata.len(),
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(key)?;
        let data = fs::read(&path)
            .await
            .map_err(|e| Self::map_not_found(key, e))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_stream(&self, key: &str) -> StorageResult<ByteStream> {
        use tokio::io::AsyncReadExt;

        let path = self.key_path(key)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| Self::map_not_found(key, e))?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", len = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        let path = self.key_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to a sibling temp file and rename so readers never observe
        // a partially written object.
        let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        drop(file);

        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // A prefix is a key fragment, not a directory: listing `updates/ab`
        // must match `updates/abc/x`. Walk from the deepest directory the
        // prefix names and filter by string prefix.
        if prefix.contains("..") || prefix.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {prefix}"
            )));
        }

        let start_dir = match prefix.rsplit_once('/') {
            Some((dir, _)) => self.root.join(dir),
            None => self.root.clone(),
        };
        if !fs::try_exists(&start_dir).await.map_err(StorageError::Io)? {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut pending = vec![start_dir];
        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir).await.map_err(StorageError::Io)?;
            while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(StorageError::Io)?;
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    let relative = path
                        .strip_prefix(&self.root)
                        .map_err(|_| StorageError::Backend("listing escaped root".to_string()))?;
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn backend() -> (tempfile::TempDir, FilesystemBackend) {
        let temp = tempdir().unwrap();
        let backend = FilesystemBackend::new(temp.path()).await.unwrap();
        (temp, backend)
    }

    #[tokio::test]
    async fn put_get_roundtrip() {
        let (_temp, store) = backend().await;
        store
            .put("updates/abc/bundle.js", Bytes::from_static(b"console.log(1)"))
            .await
            .unwrap();

        assert!(store.exists("updates/abc/bundle.js").await.unwrap());
        let data = store.get("updates/abc/bundle.js").await.unwrap();
        assert_eq!(&data[..], b"console.log(1)");
        assert_eq!(store.head("updates/abc/bundle.js").await.unwrap().size, 14);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_temp, store) = backend().await;
        match store.get("nope").await {
            Err(StorageError::NotFound(key)) => assert_eq!(key, "nope"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_temp, store) = backend().await;
        store.put("a/b", Bytes::from_static(b"x")).await.unwrap();
        store.delete("a/b").await.unwrap();
        store.delete("a/b").await.unwrap();
        assert!(!store.exists("a/b").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let (_temp, store) = backend().await;
        for key in ["../escape", "/etc/passwd", "a/../../b", "./a"] {
            match store.get(key).await {
                Err(StorageError::InvalidKey(_)) => {}
                other => panic!("{key:?} should be rejected, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn list_filters_by_key_prefix() {
        let (_temp, store) = backend().await;
        store
            .put("updates/u1/a.png", Bytes::from_static(b"1"))
            .await
            .unwrap();
        store
            .put("updates/u1/nested/b.png", Bytes::from_static(b"2"))
            .await
            .unwrap();
        store
            .put("updates/u2/c.png", Bytes::from_static(b"3"))
            .await
            .unwrap();

        let keys = store.list("updates/u1/").await.unwrap();
        assert_eq!(keys, vec!["updates/u1/a.png", "updates/u1/nested/b.png"]);

        let all = store.list("updates/").await.unwrap();
        assert_eq!(all.len(), 3);

        assert!(store.list("updates/u3/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_prefix_removes_everything_under_it() {
        let (_temp, store) = backend().await;
        store.put("updates/u1/a", Bytes::from_static(b"1")).await.unwrap();
        store.put("updates/u1/b/c", Bytes::from_static(b"2")).await.unwrap();
        store.put("updates/u2/d", Bytes::from_static(b"3")).await.unwrap();

        let removed = store.delete_prefix("updates/u1/").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.list("updates/u1/").await.unwrap().is_empty());
        assert!(store.exists("updates/u2/d").await.unwrap());
    }

    #[tokio::test]
    async fn get_stream_yields_full_content() {
        use futures::TryStreamExt;

        let (_temp, store) = backend().await;
        let payload = vec![7u8; STREAM_CHUNK_SIZE * 2 + 11];
        store
            .put("big.bin", Bytes::from(payload.clone()))
            .await
            .unwrap();

        let mut stream = store.get_stream("big.bin").await.unwrap();
        let mut collected = Vec::new();
        while let Some(chunk) = stream.try_next().await.unwrap() {
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, payload);
    }
}
