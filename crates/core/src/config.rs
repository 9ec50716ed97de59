//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Public base URL used when rendering asset URLs in manifests.
    /// Overridable via the `PUBLIC_URL` environment variable.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Informational environment name, reported by the health endpoint.
    /// Overridable via the `ENVIRONMENT` environment variable.
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Shared secret for `POST /upload`. When set, the `upload-key` request
    /// header must match. Overridable via `UPLOAD_SECRET_KEY`.
    #[serde(default)]
    pub upload_secret_key: Option<String>,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: default_public_url(),
            environment: default_environment(),
            upload_secret_key: None,
        }
    }
}

impl ServerConfig {
    /// The public URL without a trailing slash, ready for concatenation.
    pub fn public_url_base(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix.
        prefix: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO
        /// and some S3-compatible services.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Filesystem {
            path: PathBuf::from("data/blobs"),
        }
    }
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database file.
    Sqlite {
        /// Path to the database file; parent directories are created.
        path: PathBuf,
    },
}

impl Default for MetadataConfig {
    fn default() -> Self {
        MetadataConfig::Sqlite {
            path: PathBuf::from("data/updraft.db"),
        }
    }
}

/// Full application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Create a test configuration with placeholder paths.
    ///
    /// **For testing only.** Callers are expected to point `storage` and
    /// `metadata` at a temporary directory before use.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
                public_url: default_public_url(),
                environment: "test".to_string(),
                upload_secret_key: None,
            },
            storage: StorageConfig::default(),
            metadata: MetadataConfig::default(),
        }
    }
}
