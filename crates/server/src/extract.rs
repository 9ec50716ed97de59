//! Bundle archive ingestion.
//!
//! Unpacks an uploaded ZIP, pulls out the three declarative descriptors
//! (`app.json`, `package.json`, `metadata.json`), derives the
//! content-addressed update id and fans the remaining entries into blob
//! storage under `updates/{updateId}/`.

use bytes::Bytes;
use futures::StreamExt;
use std::io::{Cursor, Read};
use std::sync::Arc;
use thiserror::Error;
use updraft_core::update_id_from_metadata;
use updraft_storage::{ObjectStore, StorageError};
use uuid::Uuid;
use zip::ZipArchive;

/// Parallelism of asset writes into blob storage.
const PUT_CONCURRENCY: usize = 8;

/// Archive extraction error type. All variants are fatal to the upload;
/// no metadata row is written when any of them occurs.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("archive is missing required entry {0}")]
    MissingEntry(&'static str),

    #[error("archive entry {0} is not valid JSON: {1}")]
    MalformedJson(&'static str, String),

    #[error("archive entry {0} has no `{1}` object")]
    MissingObject(&'static str, &'static str),

    #[error("invalid zip archive: {0}")]
    InvalidArchive(String),

    #[error("archive entry has an unsafe path: {0}")]
    UnsafeEntryPath(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// The descriptors lifted out of a successfully parsed bundle.
#[derive(Debug)]
pub struct ExtractedBundle {
    /// Content-addressed id derived from `metadata.json`.
    pub update_id: Uuid,
    /// The `expo` sub-object of `app.json`, serialized.
    pub app_json: String,
    /// The `dependencies` sub-object of `package.json`, serialized.
    pub dependencies_json: String,
    /// `metadata.json`, verbatim.
    pub metadata_json: String,
    /// Number of entries written to blob storage.
    pub asset_count: usize,
}

/// Parsed archive prior to the storage fan-out.
struct ParsedBundle {
    update_id: Uuid,
    app_json: String,
    dependencies_json: String,
    metadata_json: String,
    files: Vec<(String, Bytes)>,
}

/// Unpack `archive` and write its entries to blob storage.
///
/// Parsing happens on a blocking thread (ZIP inflation is CPU-bound sync
/// IO); the storage fan-out runs with bounded concurrency. On failure no
/// upload row exists yet, so any blobs already written are unreferenced
/// orphans and left for out-of-band cleanup.
pub async fn extract_bundle(
    storage: &Arc<dyn ObjectStore>,
    archive: Bytes,
) -> Result<ExtractedBundle, ExtractError> {
    let parsed = tokio::task::spawn_blocking(move || parse_archive(archive))
        .await
        .map_err(|e| ExtractError::InvalidArchive(format!("extraction task failed: {e}")))?;
    let parsed = parsed?;

    let update_id = parsed.update_id;
    let asset_count = parsed.files.len();

    let mut puts = futures::stream::iter(parsed.files.into_iter().map(|(path, data)| {
        let storage = Arc::clone(storage);
        let key = format!("updates/{update_id}/{path}");
        async move { storage.put(&key, data).await }
    }))
    .buffer_unordered(PUT_CONCURRENCY);

    while let Some(result) = puts.next().await {
        result?;
    }

    tracing::debug!(update_id = %update_id, assets = asset_count, "bundle extracted");

    Ok(ExtractedBundle {
        update_id,
        app_json: parsed.app_json,
        dependencies_json: parsed.dependencies_json,
        metadata_json: parsed.metadata_json,
        asset_count,
    })
}

fn parse_archive(archive: Bytes) -> Result<ParsedBundle, ExtractError> {
    let mut zip = ZipArchive::new(Cursor::new(archive))
        .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;

    let app_bytes = read_entry(&mut zip, "app.json")?;
    let package_bytes = read_entry(&mut zip, "package.json")?;
    let metadata_bytes = read_entry(&mut zip, "metadata.json")?;

    let app: serde_json::Value = serde_json::from_slice(&app_bytes)
        .map_err(|e| ExtractError::MalformedJson("app.json", e.to_string()))?;
    let expo = app
        .get("expo")
        .ok_or(ExtractError::MissingObject("app.json", "expo"))?;
    let app_json = expo.to_string();

    let package: serde_json::Value = serde_json::from_slice(&package_bytes)
        .map_err(|e| ExtractError::MalformedJson("package.json", e.to_string()))?;
    let dependencies_json = package
        .get("dependencies")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}))
        .to_string();

    // Validate without reformatting; the stored copy stays byte-identical
    // so the derived id remains reproducible.
    serde_json::from_slice::<serde_json::Value>(&metadata_bytes)
        .map_err(|e| ExtractError::MalformedJson("metadata.json", e.to_string()))?;
    let update_id = update_id_from_metadata(&metadata_bytes);
    let metadata_json = String::from_utf8(metadata_bytes)
        .map_err(|e| ExtractError::MalformedJson("metadata.json", e.to_string()))?;

    let mut files = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| ExtractError::InvalidArchive(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }

        let raw_name = entry.name().to_string();
        let Some(safe_path) = entry.enclosed_name() else {
            return Err(ExtractError::UnsafeEntryPath(raw_name));
        };
        let path = safe_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| ExtractError::InvalidArchive(format!("reading {raw_name}: {e}")))?;
        files.push((path, Bytes::from(data)));
    }

    Ok(ParsedBundle {
        update_id,
        app_json,
        dependencies_json,
        metadata_json,
        files,
    })
}

fn read_entry(
    zip: &mut ZipArchive<Cursor<Bytes>>,
    name: &'static str,
) -> Result<Vec<u8>, ExtractError> {
    let mut entry = match zip.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ExtractError::MissingEntry(name));
        }
        Err(e) => return Err(ExtractError::InvalidArchive(e.to_string())),
    };
    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .map_err(|e| ExtractError::InvalidArchive(format!("reading {name}: {e}")))?;
    Ok(data)
}
