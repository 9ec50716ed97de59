//! HTTP update-delivery server for updraft.
//!
//! This crate provides the serving engine:
//! - Bundle archive ingestion (`POST /upload`)
//! - App registry endpoints
//! - Release lifecycle and retention cleanup
//! - Manifest synthesis, signing, and the multipart client protocol
//! - Asset streaming

pub mod cache;
pub mod cleanup;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod manifest;
pub mod routes;
pub mod state;

pub use cache::{CachedManifest, ManifestCache};
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
