//! Signer error types.

use crate::pem::PemError;
use thiserror::Error;

/// Signing and key-handling error type.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error(transparent)]
    Pem(#[from] PemError),

    #[error(
        "PKCS#1 private keys cannot be used for signing; \
         convert to PKCS#8 with `openssl pkcs8 -topk8 -nocrypt`"
    )]
    Pkcs1Unsupported,

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signature verification failed")]
    VerificationFailed,
}

/// Result type alias for signer operations.
pub type SignerResult<T> = std::result::Result<T, SignerError>;
