//! Bundle ingestion and release handlers.

use crate::cleanup::{CleanupReport, cleanup_channel};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ExtractError, extract_bundle};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use serde::Serialize;
use time::OffsetDateTime;
use updraft_core::UploadStatus;
use updraft_metadata::models::UploadRow;
use uuid::Uuid;

/// Response of `POST /upload`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub upload_id: Uuid,
    pub update_id: Uuid,
}

/// One row of `GET /uploads`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSummary {
    pub upload_id: Uuid,
    pub update_id: Uuid,
    pub project: String,
    pub version: String,
    pub release_channel: String,
    pub status: UploadStatus,
    pub original_filename: String,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub released_at: Option<OffsetDateTime>,
}

impl From<UploadRow> for UploadSummary {
    fn from(row: UploadRow) -> Self {
        let status = row.status();
        Self {
            upload_id: row.upload_id,
            update_id: row.update_id,
            project: row.project,
            version: row.version,
            release_channel: row.release_channel,
            status,
            original_filename: row.original_filename,
            git_branch: row.git_branch,
            git_commit: row.git_commit,
            created_at: row.created_at,
            released_at: row.released_at,
        }
    }
}

fn required_header(headers: &HeaderMap, name: &'static str) -> ApiResult<String> {
    optional_header(headers, name)
        .ok_or_else(|| ApiError::BadRequest(format!("missing required header: {name}")))
}

fn optional_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
}

impl From<ExtractError> for ApiError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Storage(inner) => inner.into(),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

/// Reduce a client-supplied filename to a single safe path component; it
/// becomes part of the archive's blob key.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.is_empty() || base == "." || base == ".." {
        "bundle.zip".to_string()
    } else {
        base.to_string()
    }
}

/// POST /upload - Ingest a bundle archive.
///
/// Multipart field `uri` carries the ZIP; `project`, `version` and
/// `release-channel` headers locate it. Extraction runs before the row is
/// inserted, so a failed upload leaves no metadata behind.
pub async fn upload_bundle(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let project = required_header(&headers, "project")?;
    let version = required_header(&headers, "version")?;
    let release_channel = required_header(&headers, "release-channel")?;

    if let Some(secret) = &state.config.server.upload_secret_key {
        let provided = optional_header(&headers, "upload-key");
        if provided.as_deref() != Some(secret.as_str()) {
            return Err(ApiError::Forbidden("invalid upload key".to_string()));
        }
    }

    let mut archive = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("uri") {
            let filename = sanitize_filename(field.file_name().unwrap_or_default());
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read archive: {e}")))?;
            archive = Some((filename, data));
        }
    }
    let Some((filename, data)) = archive else {
        return Err(ApiError::BadRequest(
            "missing multipart field: uri".to_string(),
        ));
    };

    let upload_id = Uuid::new_v4();
    let archive_key = format!("uploads/{upload_id}/{filename}");
    state.storage.put(&archive_key, data.clone()).await?;

    let extracted = extract_bundle(&state.storage, data).await?;

    let upload = UploadRow {
        upload_id,
        project: project.clone(),
        version,
        release_channel,
        status: UploadStatus::Ready.as_str().to_string(),
        path: archive_key,
        update_id: extracted.update_id,
        app_json: extracted.app_json,
        dependencies_json: extracted.dependencies_json,
        metadata_json: extracted.metadata_json,
        original_filename: filename,
        git_branch: optional_header(&headers, "git-branch"),
        git_commit: optional_header(&headers, "git-commit"),
        created_at: OffsetDateTime::now_utc(),
        released_at: None,
    };
    state.metadata.insert_upload(&upload).await?;

    tracing::info!(
        upload_id = %upload_id,
        update_id = %extracted.update_id,
        project = %project,
        assets = extracted.asset_count,
        "bundle ingested"
    );

    Ok(Json(UploadResponse {
        upload_id,
        update_id: extracted.update_id,
    }))
}

/// Shared release flow: state transition, cache invalidation, cleanup.
///
/// When `expected_project` is set (the namespaced route), an upload
/// belonging to another project reads as absent.
async fn perform_release(
    state: &AppState,
    upload_id: Uuid,
    expected_project: Option<&str>,
) -> ApiResult<(UploadRow, CleanupReport)> {
    let upload = state
        .metadata
        .get_upload(upload_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("upload {upload_id}")))?;
    if let Some(slug) = expected_project
        && upload.project != slug
    {
        return Err(ApiError::NotFound(format!("upload {upload_id}")));
    }

    let released = state
        .metadata
        .release_upload(upload_id, OffsetDateTime::now_utc())
        .await?;

    // Invalidate only after the transition committed; a stale entry is
    // bounded by the cache TTL, a premature one could re-cache old state.
    state
        .cache
        .invalidate_manifest(
            &released.project,
            &released.version,
            &released.release_channel,
        )
        .await;

    let report = cleanup_channel(
        &state.metadata,
        &state.storage,
        &released.project,
        &released.release_channel,
    )
    .await?;

    tracing::info!(
        upload_id = %upload_id,
        project = %released.project,
        channel = %released.release_channel,
        "upload released"
    );
    Ok((released, report))
}

/// Response of the namespaced release endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseResponse {
    pub upload_id: Uuid,
    pub project: String,
    pub release_channel: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub released_at: Option<OffsetDateTime>,
    pub cleanup: CleanupReport,
}

/// PUT /release/{uploadId} - Legacy release endpoint, text response.
pub async fn release_upload(
    State(state): State<AppState>,
    Path(upload_id): Path<Uuid>,
) -> ApiResult<String> {
    let (released, _report) = perform_release(&state, upload_id, None).await?;
    Ok(format!(
        "released upload {} on channel {}\n",
        released.upload_id, released.release_channel
    ))
}

/// PUT /apps/{slug}/release/{uploadId} - Release within an app namespace.
pub async fn release_namespaced(
    State(state): State<AppState>,
    Path((slug, upload_id)): Path<(String, Uuid)>,
) -> ApiResult<Json<ReleaseResponse>> {
    let (released, cleanup) = perform_release(&state, upload_id, Some(&slug)).await?;
    Ok(Json(ReleaseResponse {
        upload_id: released.upload_id,
        project: released.project,
        release_channel: released.release_channel,
        released_at: released.released_at,
        cleanup,
    }))
}

/// GET /uploads - List all uploads, newest first.
pub async fn list_uploads(State(state): State<AppState>) -> ApiResult<Json<Vec<UploadSummary>>> {
    let uploads = state.metadata.list_uploads().await?;
    Ok(Json(uploads.into_iter().map(UploadSummary::from).collect()))
}
