//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use updraft_core::UploadStatus;
use uuid::Uuid;

/// Registered application record.
#[derive(Debug, Clone, FromRow)]
pub struct AppRow {
    pub slug: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub owner_email: Option<String>,
    /// Normalized PEM certificate. Set together with `private_key_pem` or
    /// not at all.
    pub certificate_pem: Option<String>,
    /// Normalized PKCS#8 PEM private key matching the certificate.
    pub private_key_pem: Option<String>,
    pub auto_cleanup_enabled: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl AppRow {
    /// Whether both halves of the signing keypair are present.
    pub fn certificate_configured(&self) -> bool {
        self.certificate_pem.is_some() && self.private_key_pem.is_some()
    }
}

/// One ingested bundle archive.
#[derive(Debug, Clone, FromRow)]
pub struct UploadRow {
    pub upload_id: Uuid,
    /// App slug. Uploads may precede app registration.
    pub project: String,
    /// Opaque runtime version string.
    pub version: String,
    pub release_channel: String,
    /// Stored `UploadStatus` string; see [`UploadRow::status`].
    pub status: String,
    /// Blob key of the original archive (`uploads/{uploadId}/{filename}`).
    pub path: String,
    /// Content-addressed update id derived from `metadata.json`.
    pub update_id: Uuid,
    /// The `expo` sub-object of the bundle's `app.json`.
    pub app_json: String,
    /// The `dependencies` sub-object of the bundle's `package.json`.
    pub dependencies_json: String,
    /// The bundle's `metadata.json`, verbatim.
    pub metadata_json: String,
    pub original_filename: String,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub created_at: OffsetDateTime,
    pub released_at: Option<OffsetDateTime>,
}

impl UploadRow {
    /// Parsed lifecycle status.
    pub fn status(&self) -> UploadStatus {
        UploadStatus::parse(&self.status).unwrap_or(UploadStatus::Ready)
    }

    /// Blob key prefix owning this upload's extracted assets.
    pub fn assets_prefix(&self) -> String {
        format!("updates/{}/", self.update_id)
    }
}

/// Aggregate upload statistics for one app.
#[derive(Debug, Clone, Default)]
pub struct AppStats {
    pub total_uploads: i64,
    pub released_uploads: i64,
    pub last_update: Option<OffsetDateTime>,
    pub last_release: Option<OffsetDateTime>,
}
