//! Manifest records served to clients and the bundle metadata they are
//! built from.

use crate::error::{Error, Result};
use crate::platform::Platform;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// One downloadable asset of an update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    /// base64url(SHA-256) of the asset bytes.
    pub hash: String,
    /// hex(MD5) of the asset bytes, the client's stable cache key.
    pub key: String,
    pub file_extension: String,
    pub content_type: String,
    /// Absolute URL resolving to the asset server.
    pub url: String,
}

/// The manifest for one update on one platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateManifest {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub runtime_version: String,
    pub assets: Vec<AssetDescriptor>,
    pub launch_asset: AssetDescriptor,
}

/// A `{path, ext}` pair from the bundle's `fileMetadata` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AssetRef {
    pub path: String,
    pub ext: String,
}

/// The per-platform subtree of a bundle's `metadata.json`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct PlatformFiles {
    /// Relative path of the launch bundle within the update.
    pub bundle: String,
    #[serde(default)]
    pub assets: Vec<AssetRef>,
}

impl PlatformFiles {
    /// Select the platform subtree from a stored `metadata.json` document.
    ///
    /// Returns `Ok(None)` when the bundle carries no entry for `platform`;
    /// the bundle format does not require both platforms to be present.
    pub fn from_metadata(metadata_json: &str, platform: Platform) -> Result<Option<Self>> {
        let doc: serde_json::Value = serde_json::from_str(metadata_json)
            .map_err(|e| Error::BundleMetadata(format!("metadata.json is not valid JSON: {e}")))?;

        let Some(subtree) = doc
            .get("fileMetadata")
            .and_then(|fm| fm.get(platform.as_str()))
        else {
            return Ok(None);
        };

        let files: PlatformFiles = serde_json::from_value(subtree.clone()).map_err(|e| {
            Error::BundleMetadata(format!("fileMetadata.{platform} is malformed: {e}"))
        })?;
        Ok(Some(files))
    }
}
