//! Health endpoint.

use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use serde::Serialize;

/// Health info response.
#[derive(Debug, Serialize)]
pub struct HealthInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: String,
}

/// GET / - Service identity and environment.
pub async fn health_info(State(state): State<AppState>) -> Json<HealthInfo> {
    Json(HealthInfo {
        name: "updraft",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.server.environment.clone(),
    })
}
