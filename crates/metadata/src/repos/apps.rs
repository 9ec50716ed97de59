//! App registry repository.

use crate::error::MetadataResult;
use crate::models::{AppRow, AppStats};
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for app lifecycle operations.
#[async_trait]
pub trait AppRepo: Send + Sync {
    /// Create a new app. Fails with `AlreadyExists` on a duplicate slug.
    async fn create_app(&self, app: &AppRow) -> MetadataResult<()>;

    /// Get an app by slug.
    async fn get_app(&self, slug: &str) -> MetadataResult<Option<AppRow>>;

    /// List all apps ordered by creation time.
    async fn list_apps(&self) -> MetadataResult<Vec<AppRow>>;

    /// Store both halves of an app's signing keypair.
    /// Fails with `NotFound` if the app does not exist.
    async fn set_certificate(
        &self,
        slug: &str,
        certificate_pem: &str,
        private_key_pem: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Toggle automatic obsolete-upload cleanup for an app.
    async fn set_auto_cleanup(
        &self,
        slug: &str,
        enabled: bool,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()>;

    /// Delete the app row. Upload rows are removed separately by the
    /// cleanup coordinator before this is called.
    async fn delete_app(&self, slug: &str) -> MetadataResult<()>;

    /// Aggregate upload statistics for an app.
    async fn app_stats(&self, slug: &str) -> MetadataResult<AppStats>;
}
