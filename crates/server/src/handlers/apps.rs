//! App registry handlers.

use crate::cleanup::delete_app_cascade;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use updraft_core::validate::{validate_email, validate_slug};
use updraft_metadata::models::{AppRow, AppStats};
use updraft_signer::{normalize_certificate, normalize_private_key};

/// Request body for `POST /register-app`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAppRequest {
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner_email: Option<String>,
}

/// Request body for `PUT /apps/{slug}/certificate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRequest {
    pub certificate: String,
    pub private_key: String,
}

/// Request body for `PUT /apps/{slug}/settings`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub auto_cleanup_enabled: bool,
}

/// App summary returned by the registry endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppResponse {
    pub slug: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner_email: Option<String>,
    pub certificate_status: &'static str,
    pub auto_cleanup_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<AppRow> for AppResponse {
    fn from(app: AppRow) -> Self {
        let certificate_status = if app.certificate_configured() {
            "configured"
        } else {
            "not_configured"
        };
        Self {
            slug: app.slug,
            name: app.display_name,
            description: app.description,
            owner_email: app.owner_email,
            certificate_status,
            auto_cleanup_enabled: app.auto_cleanup_enabled,
            created_at: app.created_at,
            updated_at: app.updated_at,
        }
    }
}

/// App details with aggregate upload statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDetailsResponse {
    #[serde(flatten)]
    pub app: AppResponse,
    pub total_uploads: i64,
    pub released_uploads: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_update: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_release: Option<OffsetDateTime>,
}

impl AppDetailsResponse {
    fn new(app: AppRow, stats: AppStats) -> Self {
        Self {
            app: app.into(),
            total_uploads: stats.total_uploads,
            released_uploads: stats.released_uploads,
            last_update: stats.last_update,
            last_release: stats.last_release,
        }
    }
}

/// POST /register-app - Create an app.
pub async fn register_app(
    State(state): State<AppState>,
    Json(request): Json<RegisterAppRequest>,
) -> ApiResult<Json<AppResponse>> {
    validate_slug(&request.slug)?;
    if let Some(email) = &request.owner_email {
        validate_email(email)?;
    }

    let now = OffsetDateTime::now_utc();
    let app = AppRow {
        slug: request.slug,
        display_name: request.name,
        description: request.description,
        owner_email: request.owner_email,
        certificate_pem: None,
        private_key_pem: None,
        auto_cleanup_enabled: true,
        created_at: now,
        updated_at: now,
    };
    state.metadata.create_app(&app).await.map_err(|e| match e {
        updraft_metadata::MetadataError::AlreadyExists(_) => {
            ApiError::Conflict(format!("app {} already exists", app.slug))
        }
        other => other.into(),
    })?;

    tracing::info!(slug = %app.slug, "app registered");
    Ok(Json(app.into()))
}

/// PUT /apps/{slug}/certificate - Attach a certificate and private key.
///
/// Both halves must normalize through the PEM codec; an app never holds
/// one without the other.
pub async fn put_certificate(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<CertificateRequest>,
) -> ApiResult<Json<AppResponse>> {
    let certificate = normalize_certificate(&request.certificate)
        .map_err(|e| ApiError::Validation(format!("certificate: {e}")))?;
    let private_key = normalize_private_key(&request.private_key)
        .map_err(|e| ApiError::Validation(format!("private key: {e}")))?;

    let now = OffsetDateTime::now_utc();
    state
        .metadata
        .set_certificate(&slug, &certificate, &private_key, now)
        .await?;

    let app = state
        .metadata
        .get_app(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app {slug}")))?;

    tracing::info!(slug = %slug, "certificate attached");
    Ok(Json(app.into()))
}

/// GET /certificate/{slug} - Download the app's certificate.
pub async fn get_certificate(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Response> {
    let app = state
        .metadata
        .get_app(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app {slug}")))?;
    let certificate = app
        .certificate_pem
        .ok_or_else(|| ApiError::NotFound(format!("app {slug} has no certificate")))?;

    Ok((
        [
            (CONTENT_TYPE, "text/plain".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{slug}-certificate.pem\""),
            ),
        ],
        certificate,
    )
        .into_response())
}

/// GET /apps - List all apps.
pub async fn list_apps(State(state): State<AppState>) -> ApiResult<Json<Vec<AppResponse>>> {
    let apps = state.metadata.list_apps().await?;
    Ok(Json(apps.into_iter().map(AppResponse::from).collect()))
}

/// GET /apps/{slug} - App details with upload statistics.
pub async fn get_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<AppDetailsResponse>> {
    let app = state
        .metadata
        .get_app(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app {slug}")))?;
    let stats = state.metadata.app_stats(&slug).await?;
    Ok(Json(AppDetailsResponse::new(app, stats)))
}

/// PUT /apps/{slug}/settings - Update app settings.
pub async fn put_settings(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<SettingsRequest>,
) -> ApiResult<Json<AppResponse>> {
    state
        .metadata
        .set_auto_cleanup(&slug, request.auto_cleanup_enabled, OffsetDateTime::now_utc())
        .await?;

    let app = state
        .metadata
        .get_app(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app {slug}")))?;
    Ok(Json(app.into()))
}

/// Response of a cascading app delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAppResponse {
    pub slug: String,
    pub deleted_uploads: u64,
}

/// DELETE /apps/{slug} - Delete an app and everything it owns.
pub async fn delete_app(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<DeleteAppResponse>> {
    // Resolve first so a bogus slug is a 404, not a silent no-op cascade.
    state
        .metadata
        .get_app(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("app {slug}")))?;

    let deleted_uploads =
        delete_app_cascade(&state.metadata, &state.storage, &state.cache, &slug).await?;

    Ok(Json(DeleteAppResponse {
        slug,
        deleted_uploads,
    }))
}
