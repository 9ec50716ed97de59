//! Core domain types and shared logic for the updraft update-delivery service.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Content-addressed update identifiers
//! - Platform and upload status enums
//! - Manifest and asset descriptor records
//! - Slug and email validation
//! - Configuration types

pub mod config;
pub mod error;
pub mod hash;
pub mod ids;
pub mod manifest;
pub mod platform;
pub mod status;
pub mod validate;

pub use config::{AppConfig, MetadataConfig, ServerConfig, StorageConfig};
pub use error::{Error, Result};
pub use ids::update_id_from_metadata;
pub use manifest::{AssetDescriptor, AssetRef, PlatformFiles, UpdateManifest};
pub use platform::Platform;
pub use status::UploadStatus;

/// TTL for cached manifests: 300 seconds
pub const MANIFEST_CACHE_TTL_SECS: u64 = 300;

/// Obsolete uploads retained per (project, channel) by the cleanup pass
pub const OBSOLETE_RETENTION: usize = 30;

/// Release channels assumed to exist when invalidating caches on app delete.
pub const WELL_KNOWN_CHANNELS: [&str; 3] = ["production", "staging", "development"];
