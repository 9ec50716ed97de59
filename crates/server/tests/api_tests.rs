//! Integration tests for the HTTP surface: health, app registry,
//! ingestion, and asset serving.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::fixtures;
use common::server::TestServer;
use common::server::parse_manifest_part;
use serde_json::json;
use sha2::{Digest, Sha256};

#[tokio::test]
async fn health_reports_identity() {
    let server = TestServer::new().await;
    let (status, body) = server.json_request("GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "updraft");
    assert_eq!(body["environment"], "test");
    assert!(body["version"].as_str().is_some());
}

#[tokio::test]
async fn register_app_validates_input() {
    let server = TestServer::new().await;

    let (status, _) = server
        .json_request("POST", "/register-app", Some(json!({"slug": "bad slug!"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .json_request(
            "POST",
            "/register-app",
            Some(json!({"slug": "demo", "ownerEmail": "not-an-email"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .json_request(
            "POST",
            "/register-app",
            Some(json!({"slug": "demo", "name": "Demo", "ownerEmail": "dev@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slug"], "demo");
    assert_eq!(body["certificateStatus"], "not_configured");
    assert_eq!(body["autoCleanupEnabled"], true);
}

#[tokio::test]
async fn duplicate_slug_conflicts() {
    let server = TestServer::new().await;
    server.register_app("demo").await;
    let (status, _) = server
        .json_request("POST", "/register-app", Some(json!({"slug": "demo"})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn upload_requires_headers() {
    let server = TestServer::new().await;
    let zip = fixtures::bundle_zip("h");

    // Missing release-channel: send only two of three required headers.
    let mut body = Vec::new();
    body.extend_from_slice(
        b"--b\r\nContent-Disposition: form-data; name=\"uri\"; filename=\"x.zip\"\r\n\r\n",
    );
    body.extend_from_slice(&zip);
    body.extend_from_slice(b"\r\n--b--\r\n");
    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header("Content-Type", "multipart/form-data; boundary=b")
        .header("project", "demo")
        .header("version", "1.0.0")
        .body(Body::from(body))
        .unwrap();
    let (status, _, _) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_rejects_empty_archive() {
    let server = TestServer::new().await;
    let (status, _) = server
        .upload_bundle(Vec::new(), "demo", "1.0.0", "production", &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_rejects_malformed_archives() {
    let server = TestServer::new().await;
    let (status, _) = server
        .upload_bundle(b"not a zip".to_vec(), "demo", "1.0.0", "production", &[])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An archive missing metadata.json must leave no upload row behind.
    let before = server.metadata().list_uploads().await.unwrap().len();
    let (status, _) = server
        .upload_bundle(
            fixtures::bundle_zip_without_metadata(),
            "demo",
            "1.0.0",
            "production",
            &[],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(server.metadata().list_uploads().await.unwrap().len(), before);
}

#[tokio::test]
async fn upload_secret_is_enforced_when_configured() {
    let server = TestServer::with_config(|config| {
        config.server.upload_secret_key = Some("s3cret".to_string());
    })
    .await;

    let (status, _) = server
        .upload_bundle(fixtures::bundle_zip("k"), "demo", "1.0.0", "production", &[])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .upload_bundle(
            fixtures::bundle_zip("k"),
            "demo",
            "1.0.0",
            "production",
            &[("upload-key", "wrong")],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .upload_bundle(
            fixtures::bundle_zip("k"),
            "demo",
            "1.0.0",
            "production",
            &[("upload-key", "s3cret")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_upload_release_manifest_flow() {
    let server = TestServer::new().await;
    server.register_app("demo").await;

    let (upload_id, update_id) = server.upload_ok("flow", "demo", "1.0.0", "production").await;
    assert_eq!(update_id, fixtures::expected_update_id("flow"));

    // Re-uploading the identical bundle shares the update id.
    let (other_upload, other_update) =
        server.upload_ok("flow", "demo", "1.0.0", "production").await;
    assert_ne!(upload_id, other_upload);
    assert_eq!(update_id, other_update);

    let (status, body) = server
        .json_request(
            "PUT",
            &format!("/apps/demo/release/{upload_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["uploadId"], upload_id.to_string());
    assert!(body["releasedAt"].as_str().is_some());
    assert!(body["cleanup"]["deletedCount"].is_u64());

    let request = Request::builder()
        .method("GET")
        .uri("/manifest?project=demo&platform=ios&version=1.0.0&channel=production")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::OK);

    let content_type = headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/mixed; boundary="));
    assert_eq!(headers.get("expo-protocol-version").unwrap(), "0");
    assert_eq!(headers.get("expo-sfv-version").unwrap(), "0");
    assert_eq!(headers.get("cache-control").unwrap(), "private, max-age=0");

    let body_text = String::from_utf8(body.to_vec()).unwrap();
    let (manifest_json, signature) = parse_manifest_part(content_type, &body_text);
    assert!(signature.is_none());

    let manifest: serde_json::Value = serde_json::from_str(&manifest_json).unwrap();
    assert_eq!(manifest["id"], update_id.to_string());
    assert_eq!(manifest["runtimeVersion"], "1.0.0");
    assert_eq!(manifest["launchAsset"]["contentType"], "application/javascript");
    assert_eq!(manifest["launchAsset"]["fileExtension"], ".bundle");
    assert_eq!(manifest["assets"].as_array().unwrap().len(), 1);
    assert_eq!(manifest["assets"][0]["fileExtension"], ".png");
}

#[tokio::test]
async fn asset_bytes_match_manifest_hash() {
    let server = TestServer::new().await;
    server.register_app("demo").await;
    let (upload_id, _) = server.upload_ok("hash", "demo", "1.0.0", "production").await;
    server
        .json_request("PUT", &format!("/apps/demo/release/{upload_id}"), None)
        .await;

    let request = Request::builder()
        .method("GET")
        .uri("/manifest?project=demo&platform=ios&version=1.0.0&channel=production")
        .body(Body::empty())
        .unwrap();
    let (_, headers, body) = server.raw_request(request).await;
    let content_type = headers.get("content-type").unwrap().to_str().unwrap();
    let body_text = String::from_utf8(body.to_vec()).unwrap();
    let (manifest_json, _) = parse_manifest_part(content_type, &body_text);
    let manifest: serde_json::Value = serde_json::from_str(&manifest_json).unwrap();

    for descriptor in std::iter::once(&manifest["launchAsset"])
        .chain(manifest["assets"].as_array().unwrap().iter())
    {
        let url = descriptor["url"].as_str().unwrap();
        let path_and_query = url.strip_prefix("http://localhost:3000").unwrap();
        let request = Request::builder()
            .method("GET")
            .uri(path_and_query)
            .body(Body::empty())
            .unwrap();
        let (status, headers, bytes) = server.raw_request(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers.get("cache-control").unwrap(),
            "public, max-age=31536000"
        );
        assert_eq!(
            headers.get("content-type").unwrap().to_str().unwrap(),
            descriptor["contentType"].as_str().unwrap()
        );

        // base64url(SHA-256(body)) must equal the descriptor hash.
        use base64::Engine;
        let digest = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(Sha256::digest(&bytes));
        assert_eq!(digest, descriptor["hash"].as_str().unwrap());
    }
}

#[tokio::test]
async fn asset_path_policy() {
    let server = TestServer::new().await;

    let request = Request::builder()
        .method("GET")
        .uri("/assets?asset=../../../etc/passwd")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("GET")
        .uri("/assets?asset=/etc/passwd")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let request = Request::builder()
        .method("GET")
        .uri("/assets?asset=updates/nope/missing.js")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("GET")
        .uri("/assets")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn certificate_roundtrip() {
    let server = TestServer::new().await;
    server.register_app("demo").await;

    // Malformed PEM is rejected up front.
    let (status, _) = server
        .json_request(
            "PUT",
            "/apps/demo/certificate",
            Some(json!({"certificate": "garbage", "privateKey": fixtures::test_private_key_pem()})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .json_request(
            "PUT",
            "/apps/demo/certificate",
            Some(json!({
                "certificate": fixtures::test_certificate_pem(),
                "privateKey": fixtures::test_private_key_pem(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["certificateStatus"], "configured");

    let request = Request::builder()
        .method("GET")
        .uri("/certificate/demo")
        .body(Body::empty())
        .unwrap();
    let (status, headers, bytes) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("content-type").unwrap(), "text/plain");
    assert!(
        headers
            .get("content-disposition")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("attachment")
    );
    let pem = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));

    // Unknown app has no certificate to download.
    let request = Request::builder()
        .method("GET")
        .uri("/certificate/ghost")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = server.raw_request(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn app_details_and_settings() {
    let server = TestServer::new().await;
    server.register_app("demo").await;
    let (upload_id, _) = server.upload_ok("stat", "demo", "1.0.0", "production").await;

    let (status, body) = server.json_request("GET", "/apps/demo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUploads"], 1);
    assert_eq!(body["releasedUploads"], 0);
    assert!(body["lastUpdate"].as_str().is_some());
    assert!(body["lastRelease"].is_null());

    server
        .json_request("PUT", &format!("/apps/demo/release/{upload_id}"), None)
        .await;
    let (_, body) = server.json_request("GET", "/apps/demo", None).await;
    assert_eq!(body["releasedUploads"], 1);
    assert!(body["lastRelease"].as_str().is_some());

    let (status, body) = server
        .json_request(
            "PUT",
            "/apps/demo/settings",
            Some(json!({"autoCleanupEnabled": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["autoCleanupEnabled"], false);

    let (status, body) = server.json_request("GET", "/apps", None).await;
    assert_eq!(status, StatusCode::OK);
    let apps = body.as_array().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0]["slug"], "demo");

    let (status, _) = server.json_request("GET", "/apps/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_listing() {
    let server = TestServer::new().await;
    let (upload_id, update_id) = server.upload_ok("list", "demo", "1.0.0", "staging").await;

    let (status, body) = server.json_request("GET", "/uploads", None).await;
    assert_eq!(status, StatusCode::OK);
    let uploads = body.as_array().unwrap();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0]["uploadId"], upload_id.to_string());
    assert_eq!(uploads[0]["updateId"], update_id.to_string());
    assert_eq!(uploads[0]["status"], "ready");
    assert_eq!(uploads[0]["releaseChannel"], "staging");
    assert!(uploads[0]["releasedAt"].is_null());
}
