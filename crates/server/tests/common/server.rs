//! Server test utilities.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.

use super::fixtures;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use time::OffsetDateTime;
use tower::ServiceExt;
use updraft_core::UploadStatus;
use updraft_core::config::{AppConfig, MetadataConfig, ServerConfig, StorageConfig};
use updraft_metadata::models::UploadRow;
use updraft_metadata::{MetadataStore, SqliteStore};
use updraft_server::{AppState, create_router};
use updraft_storage::{FilesystemBackend, ObjectStore};
use uuid::Uuid;

/// Boundary used for multipart upload request bodies in tests.
const TEST_BOUNDARY: &str = "updraft-test-boundary";

/// A test server wrapper with all dependencies.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary stores.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with config modifications applied.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");

        let storage_path = temp_dir.path().join("blobs");
        let storage: Arc<dyn ObjectStore> = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("failed to create storage backend"),
        );

        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("failed to create metadata store"),
        );

        let mut config = AppConfig {
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
                public_url: "http://localhost:3000".to_string(),
                environment: "test".to_string(),
                upload_secret_key: None,
            },
            storage: StorageConfig::Filesystem { path: storage_path },
            metadata: MetadataConfig::Sqlite { path: db_path },
        };
        modifier(&mut config);

        let state = AppState::new(config, storage, metadata);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    pub fn metadata(&self) -> Arc<dyn MetadataStore> {
        self.state.metadata.clone()
    }

    pub fn storage(&self) -> Arc<dyn ObjectStore> {
        self.state.storage.clone()
    }

    /// Make a JSON (or empty-body) request; returns status and parsed body.
    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Fire a raw request and return (status, headers, body bytes).
    pub async fn raw_request(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Bytes) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, headers, bytes)
    }

    /// POST /upload with a fixture bundle. Extra headers (e.g. upload-key)
    /// can be appended by the caller via `extra_headers`.
    pub async fn upload_bundle(
        &self,
        zip: Vec<u8>,
        project: &str,
        version: &str,
        channel: &str,
        extra_headers: &[(&str, &str)],
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{TEST_BOUNDARY}\r\n\
                 Content-Disposition: form-data; name=\"uri\"; filename=\"bundle.zip\"\r\n\
                 Content-Type: application/zip\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&zip);
        body.extend_from_slice(format!("\r\n--{TEST_BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={TEST_BOUNDARY}"),
            )
            .header("project", project)
            .header("version", version)
            .header("release-channel", channel);
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body)).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    /// Register an app and assert success.
    pub async fn register_app(&self, slug: &str) {
        let (status, _) = self
            .json_request(
                "POST",
                "/register-app",
                Some(serde_json::json!({"slug": slug})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register {slug} failed");
    }

    /// Upload a fixture bundle and return (uploadId, updateId).
    pub async fn upload_ok(
        &self,
        salt: &str,
        project: &str,
        version: &str,
        channel: &str,
    ) -> (Uuid, Uuid) {
        let (status, body) = self
            .upload_bundle(fixtures::bundle_zip(salt), project, version, channel, &[])
            .await;
        assert_eq!(status, StatusCode::OK, "upload failed: {body}");
        let upload_id = body["uploadId"].as_str().unwrap().parse().unwrap();
        let update_id = body["updateId"].as_str().unwrap().parse().unwrap();
        (upload_id, update_id)
    }

    /// Insert an upload row (plus its blobs) directly, bypassing the HTTP
    /// surface. Used to control `created_at` ordering and seed bulk state.
    pub async fn seed_upload(
        &self,
        project: &str,
        channel: &str,
        status: UploadStatus,
        created_at: OffsetDateTime,
    ) -> UploadRow {
        let upload_id = Uuid::new_v4();
        let update_id = Uuid::new_v4();
        let row = UploadRow {
            upload_id,
            project: project.to_string(),
            version: "1.0.0".to_string(),
            release_channel: channel.to_string(),
            status: status.as_str().to_string(),
            path: format!("uploads/{upload_id}/bundle.zip"),
            update_id,
            app_json: "{}".to_string(),
            dependencies_json: "{}".to_string(),
            metadata_json: fixtures::bundle_metadata("seeded"),
            original_filename: "bundle.zip".to_string(),
            git_branch: None,
            git_commit: None,
            created_at,
            released_at: None,
        };
        self.metadata().insert_upload(&row).await.unwrap();
        self.storage()
            .put(&row.path, Bytes::from_static(b"seeded archive"))
            .await
            .unwrap();
        self.storage()
            .put(
                &format!("updates/{update_id}/bundle.js"),
                Bytes::from_static(b"seeded js"),
            )
            .await
            .unwrap();
        row
    }
}

/// Split a multipart manifest response into the manifest JSON text and the
/// `expo-signature` part header, if present.
#[allow(dead_code)]
pub fn parse_manifest_part(content_type: &str, body: &str) -> (String, Option<String>) {
    let boundary = content_type
        .split("boundary=")
        .nth(1)
        .expect("multipart content type has a boundary")
        .trim();
    let delimiter = format!("--{boundary}");
    let parts: Vec<&str> = body.split(delimiter.as_str()).collect();
    assert!(parts.len() >= 3, "expected two multipart parts: {body}");

    let manifest_part = parts[1];
    let (headers, content) = manifest_part
        .split_once("\r\n\r\n")
        .expect("part has a blank line");
    assert!(headers.contains("name=\"manifest\""));

    let manifest_json = content
        .strip_suffix("\r\n")
        .expect("part content ends with CRLF")
        .to_string();
    let signature = headers
        .lines()
        .find_map(|line| line.strip_prefix("expo-signature: "))
        .map(|s| s.to_string());
    (manifest_json, signature)
}
