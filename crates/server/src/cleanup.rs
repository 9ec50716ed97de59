//! Cascading deletion across the metadata, blob, and cache stores.
//!
//! Two flows end here: the post-release retention pass that bounds how
//! many obsolete uploads a channel keeps, and the full cascade run when
//! an app is deleted. Blob deletion is best-effort in both; an orphaned
//! blob is recoverable, a dangling metadata row is not.

use crate::cache::ManifestCache;
use crate::error::ApiResult;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use updraft_core::{OBSOLETE_RETENTION, WELL_KNOWN_CHANNELS};
use updraft_metadata::MetadataStore;
use updraft_metadata::models::UploadRow;
use updraft_storage::ObjectStore;

/// Outcome of a retention pass, reported in release responses.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub freed_space: u64,
}

/// Retention pass for one (project, channel) timeline.
///
/// Skips entirely when the owning app is absent or has cleanup disabled.
/// Otherwise keeps the newest [`OBSOLETE_RETENTION`] obsolete uploads and
/// deletes the remainder: blobs first (best-effort), then the row.
pub async fn cleanup_channel(
    metadata: &Arc<dyn MetadataStore>,
    storage: &Arc<dyn ObjectStore>,
    project: &str,
    channel: &str,
) -> ApiResult<CleanupReport> {
    let Some(app) = metadata.get_app(project).await? else {
        return Ok(CleanupReport::default());
    };
    if !app.auto_cleanup_enabled {
        return Ok(CleanupReport::default());
    }

    let obsolete = metadata.obsolete_uploads(project, channel).await?;
    let mut report = CleanupReport::default();

    for upload in obsolete.into_iter().skip(OBSOLETE_RETENTION) {
        report.freed_space += delete_upload_blobs(storage, &upload).await;
        metadata.delete_upload(upload.upload_id).await?;
        report.deleted_count += 1;
    }

    if report.deleted_count > 0 {
        tracing::info!(
            project = %project,
            channel = %channel,
            deleted = report.deleted_count,
            freed_bytes = report.freed_space,
            "retention cleanup removed obsolete uploads"
        );
    }
    Ok(report)
}

/// Delete an app and everything it owns: blobs for every upload, the
/// upload rows, cached manifests, and finally the app row itself.
/// Returns the number of uploads removed.
pub async fn delete_app_cascade(
    metadata: &Arc<dyn MetadataStore>,
    storage: &Arc<dyn ObjectStore>,
    cache: &ManifestCache,
    slug: &str,
) -> ApiResult<u64> {
    let uploads = metadata.list_project_uploads(slug).await?;

    for upload in &uploads {
        delete_upload_blobs(storage, upload).await;
    }

    let removed = metadata.delete_project_uploads(slug).await?;

    // The cache key embeds the runtime version, so enumerate the versions
    // the deleted uploads actually used, crossed with the well-known
    // channels plus each upload's own channel.
    let mut coordinates = BTreeSet::new();
    for upload in &uploads {
        for channel in WELL_KNOWN_CHANNELS {
            coordinates.insert((upload.version.clone(), channel.to_string()));
        }
        coordinates.insert((upload.version.clone(), upload.release_channel.clone()));
    }
    for (version, channel) in coordinates {
        cache.invalidate_manifest(slug, &version, &channel).await;
    }

    metadata.delete_app(slug).await?;

    tracing::info!(slug = %slug, uploads = removed, "app deleted with cascade");
    Ok(removed)
}

/// Remove the archive blob and every extracted asset of one upload.
/// Failures are logged and skipped; returns the bytes known to be freed.
pub async fn delete_upload_blobs(storage: &Arc<dyn ObjectStore>, upload: &UploadRow) -> u64 {
    let mut freed = 0;

    freed += delete_object(storage, &upload.path).await;

    let prefix = upload.assets_prefix();
    match storage.list(&prefix).await {
        Ok(keys) => {
            for key in keys {
                freed += delete_object(storage, &key).await;
            }
        }
        Err(e) => {
            tracing::warn!(
                upload_id = %upload.upload_id,
                prefix = %prefix,
                error = %e,
                "failed to list upload assets for deletion"
            );
        }
    }
    freed
}

/// Delete a single object, returning its size when known.
async fn delete_object(storage: &Arc<dyn ObjectStore>, key: &str) -> u64 {
    let size = match storage.head(key).await {
        Ok(meta) => meta.size,
        Err(_) => 0,
    };
    match storage.delete(key).await {
        Ok(()) => size,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to delete blob");
            0
        }
    }
}
