//! Upload lifecycle states.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an upload on its (project, channel) timeline.
///
/// `Ready` is the initial state. Releasing an upload moves it to
/// `Released`, demotes strictly older siblings to `Obsolete`, and resets
/// strictly newer siblings to `Ready` so they stay candidates for a later
/// release. At most one upload per (project, channel) is `Released`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Ready,
    Released,
    Obsolete,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Ready => "ready",
            UploadStatus::Released => "released",
            UploadStatus::Obsolete => "obsolete",
        }
    }

    /// Parse from the stored representation.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ready" => Ok(UploadStatus::Ready),
            "released" => Ok(UploadStatus::Released),
            "obsolete" => Ok(UploadStatus::Obsolete),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        for status in [
            UploadStatus::Ready,
            UploadStatus::Released,
            UploadStatus::Obsolete,
        ] {
            assert_eq!(UploadStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(UploadStatus::parse("pending").is_err());
        assert!(UploadStatus::parse("Released").is_err());
    }
}
