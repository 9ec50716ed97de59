//! Content-addressed update identifiers.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derive the update identifier from the raw bytes of a bundle's
/// `metadata.json`.
///
/// The first 16 bytes of the SHA-256 digest are laid out as a
/// `8-4-4-4-12` UUID. Identical metadata bytes always yield the same id,
/// so re-uploading an unchanged bundle maps to the same update.
pub fn update_id_from_metadata(metadata: &[u8]) -> Uuid {
    let digest = Sha256::digest(metadata);
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}
