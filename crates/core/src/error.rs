//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid platform: {0} (expected ios or android)")]
    InvalidPlatform(String),

    #[error("invalid upload status: {0}")]
    InvalidStatus(String),

    #[error("invalid bundle metadata: {0}")]
    BundleMetadata(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
