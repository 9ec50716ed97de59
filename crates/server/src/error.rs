//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// API error type.
///
/// Errors render as a short plain-text body describing the kind; success
/// responses are JSON except the manifest (multipart), the certificate
/// download (text/plain) and the legacy release endpoint (text).
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] updraft_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] updraft_metadata::MetadataError),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Storage(e) => match e {
                updraft_storage::StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                updraft_storage::StorageError::InvalidKey(_) => StatusCode::FORBIDDEN,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(e) => match e {
                updraft_metadata::MetadataError::NotFound(_) => StatusCode::NOT_FOUND,
                updraft_metadata::MetadataError::AlreadyExists(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl From<updraft_core::Error> for ApiError {
    fn from(e: updraft_core::Error) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<updraft_signer::SignerError> for ApiError {
    // Signing happens with stored, already validated key material, so a
    // signer failure at manifest time is a server configuration problem.
    fn from(e: updraft_signer::SignerError) -> Self {
        ApiError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization error: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
