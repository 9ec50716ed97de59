//! Upload registry and release state machine repository.

use crate::error::MetadataResult;
use crate::models::UploadRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for upload lifecycle operations.
#[async_trait]
pub trait UploadRepo: Send + Sync {
    /// Insert a freshly extracted upload (state `ready`).
    async fn insert_upload(&self, upload: &UploadRow) -> MetadataResult<()>;

    /// Get an upload by id.
    async fn get_upload(&self, upload_id: Uuid) -> MetadataResult<Option<UploadRow>>;

    /// List all uploads, newest first.
    async fn list_uploads(&self) -> MetadataResult<Vec<UploadRow>>;

    /// List all uploads belonging to a project, newest first.
    async fn list_project_uploads(&self, project: &str) -> MetadataResult<Vec<UploadRow>>;

    /// Apply the release transition for one upload as a single transaction:
    /// on its (project, channel) timeline, strictly older siblings become
    /// `obsolete`, strictly newer siblings become `ready`, and the target
    /// becomes `released` with `released_at` stamped. Any other sibling in
    /// `released` is demoted, so at most one release survives per channel.
    ///
    /// Returns the updated row, or `NotFound` if the upload is missing.
    async fn release_upload(
        &self,
        upload_id: Uuid,
        released_at: OffsetDateTime,
    ) -> MetadataResult<UploadRow>;

    /// The most recently created `released` upload matching all four
    /// manifest coordinates.
    async fn latest_released(
        &self,
        project: &str,
        version: &str,
        channel: &str,
    ) -> MetadataResult<Option<UploadRow>>;

    /// Obsolete uploads on a (project, channel) timeline, newest first.
    /// Retention keeps a fixed count from the head of this list.
    async fn obsolete_uploads(
        &self,
        project: &str,
        channel: &str,
    ) -> MetadataResult<Vec<UploadRow>>;

    /// Delete a single upload row.
    async fn delete_upload(&self, upload_id: Uuid) -> MetadataResult<()>;

    /// Delete every upload row of a project. Returns the number removed.
    async fn delete_project_uploads(&self, project: &str) -> MetadataResult<u64>;
}
