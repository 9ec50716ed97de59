//! Manifest synthesis: asset descriptors and the multipart response body.

use crate::error::{ApiError, ApiResult};
use futures::future::try_join_all;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::sync::Arc;
use updraft_core::hash::{md5_hex, sha256_base64url};
use updraft_core::{AssetDescriptor, Platform, PlatformFiles, UpdateManifest};
use updraft_metadata::models::UploadRow;
use updraft_storage::{ObjectStore, StorageError};
use uuid::Uuid;

/// Content type of the launch asset.
const LAUNCH_CONTENT_TYPE: &str = "application/javascript";

/// Content type of every other asset. The stored bundle metadata does not
/// reliably carry MIME types; clients key off the file extension instead,
/// and the flat default keeps responses byte-compatible with them.
const ASSET_CONTENT_TYPE: &str = "application/octet-stream";

/// Query-value encoding: everything but RFC 3986 unreserved characters.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Build the per-platform manifest for a released upload.
///
/// Asset bytes are read from blob storage concurrently; the resulting
/// `assets` array preserves the order of `fileMetadata[platform].assets`.
/// Returns not-found when the bundle has no entry for `platform`.
pub async fn build_manifest(
    storage: &Arc<dyn ObjectStore>,
    public_url: &str,
    upload: &UploadRow,
    platform: Platform,
) -> ApiResult<UpdateManifest> {
    let files = PlatformFiles::from_metadata(&upload.metadata_json, platform)
        // Stored metadata was validated at ingest; failing to parse it now
        // is an integrity problem, not client error.
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "update {} has no {platform} assets",
                upload.update_id
            ))
        })?;

    let launch = describe_asset(
        storage,
        public_url,
        upload.update_id,
        files.bundle.clone(),
        None,
    );
    let assets = files
        .assets
        .iter()
        .map(|asset| {
            describe_asset(
                storage,
                public_url,
                upload.update_id,
                asset.path.clone(),
                Some(asset.ext.clone()),
            )
        })
        .collect::<Vec<_>>();

    let (launch_asset, assets) = tokio::try_join!(launch, try_join_all(assets))?;

    Ok(UpdateManifest {
        id: upload.update_id,
        created_at: upload.created_at,
        runtime_version: upload.version.clone(),
        assets,
        launch_asset,
    })
}

/// Compute one asset descriptor. `ext` is `None` for the launch asset.
async fn describe_asset(
    storage: &Arc<dyn ObjectStore>,
    public_url: &str,
    update_id: Uuid,
    path: String,
    ext: Option<String>,
) -> ApiResult<AssetDescriptor> {
    let blob_key = format!("updates/{update_id}/{path}");
    let bytes = storage.get(&blob_key).await.map_err(|e| match e {
        // The upload owns these blobs; a missing one means the stored
        // state is inconsistent, not that the client asked for a bad path.
        StorageError::NotFound(key) => ApiError::Internal(format!("missing asset blob: {key}")),
        other => other.into(),
    })?;

    let (file_extension, content_type) = match &ext {
        Some(ext) => (format!(".{ext}"), ASSET_CONTENT_TYPE),
        None => (".bundle".to_string(), LAUNCH_CONTENT_TYPE),
    };

    let url = format!(
        "{public_url}/assets?asset={}&contentType={}",
        utf8_percent_encode(&blob_key, QUERY_VALUE),
        utf8_percent_encode(content_type, QUERY_VALUE),
    );

    Ok(AssetDescriptor {
        hash: sha256_base64url(&bytes),
        key: md5_hex(&bytes),
        file_extension,
        content_type: content_type.to_string(),
        url,
    })
}

/// Render the two-part `multipart/mixed` body: the manifest (with its
/// optional `expo-signature` part header) and an empty extensions object.
pub fn multipart_body(
    boundary: &str,
    manifest_json: &str,
    signature_header: Option<&str>,
) -> String {
    let mut body = String::new();
    body.push_str(&format!("--{boundary}\r\n"));
    body.push_str("Content-Disposition: form-data; name=\"manifest\"\r\n");
    body.push_str("Content-Type: application/json; charset=utf-8\r\n");
    if let Some(signature) = signature_header {
        body.push_str(&format!("expo-signature: {signature}\r\n"));
    }
    body.push_str("\r\n");
    body.push_str(manifest_json);
    body.push_str("\r\n");
    body.push_str(&format!("--{boundary}\r\n"));
    body.push_str("Content-Disposition: form-data; name=\"extensions\"\r\n");
    body.push_str("Content-Type: application/json\r\n");
    body.push_str("\r\n");
    body.push_str("{}\r\n");
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

/// Fresh boundary for one response.
pub fn new_boundary() -> String {
    format!("updraft-{}", Uuid::new_v4().simple())
}
