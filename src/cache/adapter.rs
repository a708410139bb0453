//! Uniform lookup/store over the selected storage backend.

use super::backend::{CacheBackend, Clock, FileStore, ObjectCache};
use super::key::Fingerprint;
use crate::types::CachedPayload;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Backend selection and namespace configuration.
///
/// The capability flag is an explicit constructor input, never read from
/// ambient process state: hosts that run a shared object-cache service set
/// `shared_cache_available`, everyone else falls back to the durable file
/// store under `durable_dir`.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub shared_cache_available: bool,
    pub durable_dir: PathBuf,
    /// Cache group identifier namespacing this layer's entries.
    pub group: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            shared_cache_available: false,
            durable_dir: std::env::temp_dir().join("outbound-cache"),
            group: "http_cache".to_string(),
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shared_cache(mut self, available: bool) -> Self {
        self.shared_cache_available = available;
        self
    }

    pub fn with_durable_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.durable_dir = dir.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }
}

/// Uniform get/set surface over one backend, owning payload
/// (de)serialization.
///
/// Every failure mode on the read path collapses to a miss and every
/// failure on the write path collapses to a skipped store; neither is ever
/// surfaced to the request.
pub struct StorageAdapter {
    backend: Arc<dyn CacheBackend>,
    group: String,
}

impl StorageAdapter {
    pub fn new(backend: Arc<dyn CacheBackend>, group: impl Into<String>) -> Self {
        Self {
            backend,
            group: group.into(),
        }
    }

    /// Build the adapter from configuration, selecting the backend by the
    /// capability flag.
    pub fn from_config(config: &StorageConfig, clock: Arc<dyn Clock>) -> Self {
        let backend: Arc<dyn CacheBackend> = if config.shared_cache_available {
            Arc::new(ObjectCache::new(clock))
        } else {
            Arc::new(FileStore::new(config.durable_dir.clone(), clock))
        };
        Self::new(backend, config.group.clone())
    }

    /// Fetch and deserialize the entry under `key`. Absent, expired,
    /// malformed, and backend-faulted entries are all a miss.
    pub async fn lookup(&self, key: &Fingerprint) -> Option<CachedPayload> {
        let raw = match self.backend.get(key.as_str(), &self.group).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!(backend = self.backend.name(), error = %e, "cache read fault, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!(backend = self.backend.name(), error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Serialize and store `payload` under `key`, best effort. Returns
    /// whether the backend accepted the write.
    pub async fn store(&self, key: &Fingerprint, payload: &CachedPayload, ttl: Duration) -> bool {
        let raw = match serde_json::to_string(payload) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "cache payload failed to serialize, skipping store");
                return false;
            }
        };

        match self.backend.set(key.as_str(), &self.group, raw, ttl).await {
            Ok(accepted) => accepted,
            Err(e) => {
                debug!(backend = self.backend.name(), error = %e, "cache write fault, skipping store");
                false
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }
}
