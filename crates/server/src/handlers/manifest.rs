//! Manifest endpoint: resolve, build, sign, cache, and emit multipart.

use crate::cache::{CachedManifest, ManifestCache};
use crate::error::{ApiError, ApiResult};
use crate::manifest::{build_manifest, multipart_body, new_boundary};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header::CACHE_CONTROL, header::CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use updraft_core::Platform;
use updraft_signer::ManifestSigner;

/// One manifest coordinate, readable from a query parameter or its
/// `expo-*` header; the query parameter wins.
fn coordinate(
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    query_name: &'static str,
    header_name: &'static str,
) -> ApiResult<String> {
    params
        .get(query_name)
        .cloned()
        .or_else(|| {
            headers
                .get(header_name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "missing {query_name} (query parameter or {header_name} header)"
            ))
        })
}

/// GET /manifest - Synthesize and serve the update manifest.
pub async fn get_manifest(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let project = coordinate(&params, &headers, "project", "expo-project")?;
    let platform_raw = coordinate(&params, &headers, "platform", "expo-platform")?;
    let platform = Platform::parse(&platform_raw)?;
    let version = coordinate(&params, &headers, "version", "expo-runtime-version")?;
    let channel = coordinate(&params, &headers, "channel", "expo-channel-name")?;

    let cache_key = ManifestCache::key(&project, &version, &channel, platform);
    if let Some(hit) = state.cache.get(&cache_key).await {
        tracing::debug!(key = %cache_key, "manifest cache hit");
        return Ok(multipart_response(&hit));
    }

    let upload = state
        .metadata
        .latest_released(&project, &version, &channel)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "no released update for {project} {version} {channel}"
            ))
        })?;

    let manifest = build_manifest(&state.storage, state.public_url(), &upload, platform).await?;
    let manifest_json = serde_json::to_string(&manifest)?;

    // Sign only on request. The app may legitimately be unregistered or
    // keyless for unsigned serving, but once a client expects a signature
    // a missing key is a deployment problem, not a 4xx.
    let signature = if headers.contains_key("expo-expect-signature") {
        let private_key = state
            .metadata
            .get_app(&project)
            .await?
            .and_then(|app| app.private_key_pem)
            .ok_or_else(|| {
                ApiError::Config(format!(
                    "signature requested but project {project} has no private key"
                ))
            })?;
        let signer = ManifestSigner::from_pkcs8_pem(&private_key)?;
        Some(signer.sign(manifest_json.as_bytes()))
    } else {
        None
    };

    let entry = CachedManifest {
        manifest: manifest_json,
        signature,
    };
    state.cache.put(cache_key, entry.clone()).await;

    Ok(multipart_response(&entry))
}

/// Assemble the multipart/mixed response around a (possibly cached)
/// serialized manifest.
fn multipart_response(entry: &CachedManifest) -> Response {
    let boundary = new_boundary();
    let signature_header = entry
        .signature
        .as_deref()
        .map(ManifestSigner::signature_header);
    let body = multipart_body(&boundary, &entry.manifest, signature_header.as_deref());

    (
        StatusCode::OK,
        [
            (
                CONTENT_TYPE,
                format!("multipart/mixed; boundary={boundary}"),
            ),
            (CACHE_CONTROL, "private, max-age=0".to_string()),
        ],
        [
            ("expo-protocol-version", "0"),
            ("expo-sfv-version", "0"),
        ],
        body,
    )
        .into_response()
}
