//! Asset streaming endpoint.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use serde::Deserialize;

/// Immutable-asset cache policy: one year.
const ASSET_CACHE_CONTROL: &str = "public, max-age=31536000";

/// Query parameters of `GET /assets`.
#[derive(Debug, Deserialize)]
pub struct AssetQuery {
    pub asset: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
}

/// GET /assets - Stream asset bytes from blob storage.
///
/// The `asset` parameter is a blob key minted by the manifest builder.
/// Anything that could walk out of the store is refused outright.
pub async fn get_asset(
    State(state): State<AppState>,
    Query(query): Query<AssetQuery>,
) -> ApiResult<Response> {
    let key = query
        .asset
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing asset parameter".to_string()))?;

    if key.contains("..") || key.starts_with('/') {
        return Err(ApiError::Forbidden(format!("asset key not allowed: {key}")));
    }

    let stream = state.storage.get_stream(&key).await?;
    let body_stream = stream.map(|result| result.map_err(|e| std::io::Error::other(e.to_string())));

    let content_type = query
        .content_type
        .filter(|ct| !ct.is_empty())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, ASSET_CACHE_CONTROL.to_string()),
        ],
        Body::from_stream(body_stream),
    )
        .into_response())
}
