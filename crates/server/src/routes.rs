//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::trace::TraceLayer;

/// Maximum request body size (512 MiB). Bundle archives carry every asset
/// of an update, so they run far past the axum default of 2 MiB.
const MAX_BODY_SIZE: usize = 512 * 1024 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/", get(handlers::health_info))
        // App registry
        .route("/register-app", post(handlers::register_app))
        .route("/apps", get(handlers::list_apps))
        .route(
            "/apps/{slug}",
            get(handlers::get_app).delete(handlers::delete_app),
        )
        .route("/apps/{slug}/certificate", put(handlers::put_certificate))
        .route("/apps/{slug}/settings", put(handlers::put_settings))
        .route("/certificate/{slug}", get(handlers::get_certificate))
        // Ingestion and release lifecycle
        .route("/upload", post(handlers::upload_bundle))
        .route("/uploads", get(handlers::list_uploads))
        .route("/release/{upload_id}", put(handlers::release_upload))
        .route(
            "/apps/{slug}/release/{upload_id}",
            put(handlers::release_namespaced),
        )
        // Client-facing delivery
        .route("/manifest", get(handlers::get_manifest))
        .route("/assets", get(handlers::get_asset))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
