//! Application state shared across handlers.

use crate::cache::ManifestCache;
use std::sync::Arc;
use updraft_core::config::AppConfig;
use updraft_metadata::MetadataStore;
use updraft_storage::ObjectStore;

/// Shared application state.
///
/// The three stores are injected here and passed explicitly; nothing in
/// the engine reaches for process-global handles.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Object storage backend (archives + extracted assets).
    pub storage: Arc<dyn ObjectStore>,
    /// Metadata store (apps + uploads).
    pub metadata: Arc<dyn MetadataStore>,
    /// Manifest cache.
    pub cache: ManifestCache,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            storage,
            metadata,
            cache: ManifestCache::with_default_ttl(),
        }
    }

    /// The public base URL asset links are rendered against.
    pub fn public_url(&self) -> &str {
        self.config.server.public_url_base()
    }
}
