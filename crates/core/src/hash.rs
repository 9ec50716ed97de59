//! Digest helpers for asset descriptors.

use base64::Engine;
use md5::Md5;
use sha2::{Digest, Sha256};

/// SHA-256 of `data` encoded as unpadded base64url.
///
/// This is the `hash` field of an asset descriptor; clients compare it
/// against the digest of the downloaded bytes.
pub fn sha256_base64url(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// SHA-256 of `data` as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// MD5 of `data` as lowercase hex.
///
/// Used as the stable `key` of an asset descriptor, not for integrity.
pub fn md5_hex(data: &[u8]) -> String {
    let digest = Md5::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
