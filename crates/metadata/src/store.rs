//! Metadata store trait and the SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::{AppRow, AppStats, UploadRow};
use crate::repos::{AppRepo, UploadRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: AppRepo + UploadRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store.
///
/// The pool is limited to a single connection. SQLite permits only limited
/// write concurrency anyway, and the single writer also serializes release
/// transitions per (project, channel) as the state machine requires.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store, creating the file and schema if missing.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

const UPLOAD_COLUMNS: &str = "upload_id, project, version, release_channel, status, path, \
     update_id, app_json, dependencies_json, metadata_json, original_filename, \
     git_branch, git_commit, created_at, released_at";

/// Set `status` (and clear `released_at`) on a batch of uploads within a
/// release transaction. Rows already in the target state are skipped.
async fn apply_status(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    rows: &[UploadRow],
    status: &str,
) -> MetadataResult<()> {
    let ids: Vec<Uuid> = rows
        .iter()
        .filter(|row| row.status != status)
        .map(|row| row.upload_id)
        .collect();
    if ids.is_empty() {
        return Ok(());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE uploads SET status = ?, released_at = NULL WHERE upload_id IN ({placeholders})"
    );
    let mut query = sqlx::query(&sql).bind(status);
    for id in &ids {
        query = query.bind(id);
    }
    query.execute(&mut **tx).await?;
    Ok(())
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS apps (
                slug TEXT PRIMARY KEY,
                display_name TEXT,
                description TEXT,
                owner_email TEXT,
                certificate_pem TEXT,
                private_key_pem TEXT,
                auto_cleanup_enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS uploads (
                upload_id BLOB PRIMARY KEY,
                project TEXT NOT NULL,
                version TEXT NOT NULL,
                release_channel TEXT NOT NULL,
                status TEXT NOT NULL,
                path TEXT NOT NULL,
                update_id BLOB NOT NULL,
                app_json TEXT NOT NULL,
                dependencies_json TEXT NOT NULL,
                metadata_json TEXT NOT NULL,
                original_filename TEXT NOT NULL,
                git_branch TEXT,
                git_commit TEXT,
                created_at TEXT NOT NULL,
                released_at TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_uploads_timeline
             ON uploads(project, release_channel, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_uploads_coordinates
             ON uploads(project, version, release_channel, status)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl AppRepo for SqliteStore {
    async fn create_app(&self, app: &AppRow) -> MetadataResult<()> {
        let result = sqlx::query(
            "INSERT INTO apps (slug, display_name, description, owner_email, certificate_pem, \
             private_key_pem, auto_cleanup_enabled, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&app.slug)
        .bind(&app.display_name)
        .bind(&app.description)
        .bind(&app.owner_email)
        .bind(&app.certificate_pem)
        .bind(&app.private_key_pem)
        .bind(app.auto_cleanup_enabled)
        .bind(app.created_at)
        .bind(app.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(MetadataError::AlreadyExists(format!("app {}", app.slug)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_app(&self, slug: &str) -> MetadataResult<Option<AppRow>> {
        let app = sqlx::query_as::<_, AppRow>("SELECT * FROM apps WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(app)
    }

    async fn list_apps(&self) -> MetadataResult<Vec<AppRow>> {
        let apps = sqlx::query_as::<_, AppRow>("SELECT * FROM apps ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(apps)
    }

    async fn set_certificate(
        &self,
        slug: &str,
        certificate_pem: &str,
        private_key_pem: &str,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            "UPDATE apps SET certificate_pem = ?, private_key_pem = ?, updated_at = ? \
             WHERE slug = ?",
        )
        .bind(certificate_pem)
        .bind(private_key_pem)
        .bind(updated_at)
        .bind(slug)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("app {slug}")));
        }
        Ok(())
    }

    async fn set_auto_cleanup(
        &self,
        slug: &str,
        enabled: bool,
        updated_at: OffsetDateTime,
    ) -> MetadataResult<()> {
        let result =
            sqlx::query("UPDATE apps SET auto_cleanup_enabled = ?, updated_at = ? WHERE slug = ?")
                .bind(enabled)
                .bind(updated_at)
                .bind(slug)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("app {slug}")));
        }
        Ok(())
    }

    async fn delete_app(&self, slug: &str) -> MetadataResult<()> {
        sqlx::query("DELETE FROM apps WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn app_stats(&self, slug: &str) -> MetadataResult<AppStats> {
        let (total_uploads, released_uploads): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), \
             COALESCE(SUM(CASE WHEN status = 'released' THEN 1 ELSE 0 END), 0) \
             FROM uploads WHERE project = ?",
        )
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;

        let last_update: Option<OffsetDateTime> =
            sqlx::query_scalar("SELECT MAX(created_at) FROM uploads WHERE project = ?")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;

        let last_release: Option<OffsetDateTime> =
            sqlx::query_scalar("SELECT MAX(released_at) FROM uploads WHERE project = ?")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;

        Ok(AppStats {
            total_uploads,
            released_uploads,
            last_update,
            last_release,
        })
    }
}

#[async_trait]
impl UploadRepo for SqliteStore {
    async fn insert_upload(&self, upload: &UploadRow) -> MetadataResult<()> {
        sqlx::query(&format!(
            "INSERT INTO uploads ({UPLOAD_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(upload.upload_id)
        .bind(&upload.project)
        .bind(&upload.version)
        .bind(&upload.release_channel)
        .bind(&upload.status)
        .bind(&upload.path)
        .bind(upload.update_id)
        .bind(&upload.app_json)
        .bind(&upload.dependencies_json)
        .bind(&upload.metadata_json)
        .bind(&upload.original_filename)
        .bind(&upload.git_branch)
        .bind(&upload.git_commit)
        .bind(upload.created_at)
        .bind(upload.released_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_upload(&self, upload_id: Uuid) -> MetadataResult<Option<UploadRow>> {
        let upload = sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads WHERE upload_id = ?")
            .bind(upload_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(upload)
    }

    async fn list_uploads(&self) -> MetadataResult<Vec<UploadRow>> {
        let uploads =
            sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(uploads)
    }

    async fn list_project_uploads(&self, project: &str) -> MetadataResult<Vec<UploadRow>> {
        let uploads = sqlx::query_as::<_, UploadRow>(
            "SELECT * FROM uploads WHERE project = ? ORDER BY created_at DESC",
        )
        .bind(project)
        .fetch_all(&self.pool)
        .await?;
        Ok(uploads)
    }

    async fn release_upload(
        &self,
        upload_id: Uuid,
        released_at: OffsetDateTime,
    ) -> MetadataResult<UploadRow> {
        let mut tx = self.pool.begin().await?;

        let upload =
            sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads WHERE upload_id = ?")
                .bind(upload_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| MetadataError::NotFound(format!("upload {upload_id}")))?;

        // Partition the timeline in Rust rather than in SQL: the stored
        // timestamp text round-trips exactly, but string comparison over
        // variable-precision subseconds does not order reliably.
        let siblings = sqlx::query_as::<_, UploadRow>(
            "SELECT * FROM uploads WHERE project = ? AND release_channel = ? AND upload_id != ?",
        )
        .bind(&upload.project)
        .bind(&upload.release_channel)
        .bind(upload_id)
        .fetch_all(&mut *tx)
        .await?;

        let (older, rest): (Vec<_>, Vec<_>) = siblings
            .into_iter()
            .partition(|sibling| sibling.created_at < upload.created_at);
        // Anything not strictly older resets to ready; that also demotes a
        // currently released sibling, preserving the single-release
        // invariant even for equal timestamps.
        apply_status(&mut tx, &older, "obsolete").await?;
        apply_status(&mut tx, &rest, "ready").await?;

        sqlx::query("UPDATE uploads SET status = 'released', released_at = ? WHERE upload_id = ?")
            .bind(released_at)
            .bind(upload_id)
            .execute(&mut *tx)
            .await?;

        let updated =
            sqlx::query_as::<_, UploadRow>("SELECT * FROM uploads WHERE upload_id = ?")
                .bind(upload_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn latest_released(
        &self,
        project: &str,
        version: &str,
        channel: &str,
    ) -> MetadataResult<Option<UploadRow>> {
        let upload = sqlx::query_as::<_, UploadRow>(
            "SELECT * FROM uploads \
             WHERE project = ? AND version = ? AND release_channel = ? AND status = 'released' \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(project)
        .bind(version)
        .bind(channel)
        .fetch_optional(&self.pool)
        .await?;
        Ok(upload)
    }

    async fn obsolete_uploads(
        &self,
        project: &str,
        channel: &str,
    ) -> MetadataResult<Vec<UploadRow>> {
        let uploads = sqlx::query_as::<_, UploadRow>(
            "SELECT * FROM uploads \
             WHERE project = ? AND release_channel = ? AND status = 'obsolete' \
             ORDER BY created_at DESC",
        )
        .bind(project)
        .bind(channel)
        .fetch_all(&self.pool)
        .await?;
        Ok(uploads)
    }

    async fn delete_upload(&self, upload_id: Uuid) -> MetadataResult<()> {
        sqlx::query("DELETE FROM uploads WHERE upload_id = ?")
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_project_uploads(&self, project: &str) -> MetadataResult<u64> {
        let result = sqlx::query("DELETE FROM uploads WHERE project = ?")
            .bind(project)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
