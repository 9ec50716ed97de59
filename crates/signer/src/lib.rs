//! PEM normalization and manifest signing for updraft.
//!
//! Two concerns live here:
//! - The PEM codec that canonicalizes uploaded certificates and private
//!   keys before they are stored.
//! - The manifest signer (RSASSA-PKCS1-v1_5 / SHA-256) that produces the
//!   `expo-signature` part header for clients that request one.

pub mod error;
pub mod pem;
pub mod signer;

pub use error::{SignerError, SignerResult};
pub use pem::{PemError, normalize_certificate, normalize_private_key, pem_label};
pub use signer::{ManifestSigner, SIGNATURE_KEY_ID, verify};
