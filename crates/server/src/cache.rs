//! Short-TTL cache for synthesized manifests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use updraft_core::Platform;

/// A cached manifest body together with its signature, if one was
/// requested when the entry was filled.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedManifest {
    /// The exact serialized manifest JSON sent in the response.
    pub manifest: String,
    /// base64 signature over `manifest`, when signing was requested.
    pub signature: Option<String>,
}

/// In-process TTL map for manifests.
///
/// Entries are a pure function of store state, so concurrent writers of
/// the same key race harmlessly. Expired entries are dropped on access and
/// swept opportunistically on insert.
#[derive(Clone)]
pub struct ManifestCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<String, (Instant, CachedManifest)>>>,
}

impl ManifestCache {
    /// Create a cache with an explicit TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a cache with the service default TTL (300 s).
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::from_secs(updraft_core::MANIFEST_CACHE_TTL_SECS))
    }

    /// The cache key for one manifest coordinate tuple.
    pub fn key(project: &str, version: &str, channel: &str, platform: Platform) -> String {
        format!("manifest:{project}:{version}:{channel}:{platform}")
    }

    /// Look up an unexpired entry.
    pub async fn get(&self, key: &str) -> Option<CachedManifest> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((inserted, value)) if inserted.elapsed() < self.ttl => {
                    return Some(value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Entry exists but is stale; drop it.
        self.entries.write().await.remove(key);
        None
    }

    /// Insert an entry, sweeping out anything already expired.
    pub async fn put(&self, key: String, value: CachedManifest) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, (inserted, _)| inserted.elapsed() < ttl);
        entries.insert(key, (Instant::now(), value));
    }

    /// Remove a single entry.
    pub async fn remove(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// Invalidate both platform entries for one (project, version, channel).
    pub async fn invalidate_manifest(&self, project: &str, version: &str, channel: &str) {
        let mut entries = self.entries.write().await;
        for platform in Platform::ALL {
            entries.remove(&Self::key(project, version, channel, platform));
        }
    }
}
