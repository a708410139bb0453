//! Storage backend implementations.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Injectable time source for TTL decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Wall clock used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Deterministic clock that advances only when told to. Exists so TTL
/// expiry is testable without sleeping.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<RwLock<SystemTime>>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.read().unwrap()
    }
}

/// Storage backend contract: string payloads keyed under a group namespace,
/// with passive TTL expiry.
///
/// `get` must return `Ok(None)` for absent or expired entries; `set`
/// returns `Ok(false)` when the backend declines the write. `Err` is
/// reserved for backend faults, which callers downgrade to a miss.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str, group: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, group: &str, value: String, ttl: Duration) -> Result<bool>;
    fn name(&self) -> &'static str;
}

struct StoredEntry {
    value: String,
    expires_at: SystemTime,
}

/// Shared in-process object cache, namespaced by `(group, key)`.
///
/// Expired entries are dropped on read; there is no background sweep.
/// Capacity management is the host's concern, not this backend's.
pub struct ObjectCache {
    entries: RwLock<HashMap<(String, String), StoredEntry>>,
    clock: Arc<dyn Clock>,
}

impl ObjectCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl CacheBackend for ObjectCache {
    async fn get(&self, key: &str, group: &str) -> Result<Option<String>> {
        let map_key = (group.to_string(), key.to_string());
        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get(&map_key) {
            if self.clock.now() >= entry.expires_at {
                entries.remove(&map_key);
                return Ok(None);
            }
            return Ok(Some(entry.value.clone()));
        }
        Ok(None)
    }

    async fn set(&self, key: &str, group: &str, value: String, ttl: Duration) -> Result<bool> {
        let entry = StoredEntry {
            value,
            expires_at: self.clock.now() + ttl,
        };
        self.entries
            .write()
            .unwrap()
            .insert((group.to_string(), key.to_string()), entry);
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "object-cache"
    }
}

/// On-disk envelope for [`FileStore`] entries.
#[derive(Serialize, Deserialize)]
struct Envelope {
    /// Expiry as seconds since the Unix epoch, so entries stay valid
    /// across process restarts.
    expires_at: u64,
    value: String,
}

/// Durable key/value fallback: one JSON envelope file per key.
///
/// Writes go through a temp file and rename so readers never see a torn
/// entry. A file that fails to parse is treated as a miss.
pub struct FileStore {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            clock,
        }
    }

    fn path_for(&self, key: &str, group: &str) -> PathBuf {
        self.dir.join(format!("{group}-{key}.json"))
    }

    fn epoch_secs(&self, at: SystemTime) -> u64 {
        at.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
    }

    async fn remove_entry(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!(path = %path.display(), error = %e, "failed to drop expired cache file");
        }
    }
}

#[async_trait]
impl CacheBackend for FileStore {
    async fn get(&self, key: &str, group: &str) -> Result<Option<String>> {
        let path = self.path_for(key, group);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unreadable cache envelope, treating as miss");
                return Ok(None);
            }
        };

        if self.epoch_secs(self.clock.now()) >= envelope.expires_at {
            Self::remove_entry(&path).await;
            return Ok(None);
        }
        Ok(Some(envelope.value))
    }

    async fn set(&self, key: &str, group: &str, value: String, ttl: Duration) -> Result<bool> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let envelope = Envelope {
            expires_at: self.epoch_secs(self.clock.now() + ttl),
            value,
        };
        let raw = serde_json::to_string(&envelope)?;

        let path = self.path_for(key, group);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "file-store"
    }
}
