use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("cache entry is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Key-value backend for cached rates and salary tables.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
}

impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        (**self).put(key, entry)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        (**self).remove(key)
    }

    fn clear(&self) -> Result<(), CacheError> {
        (**self).clear()
    }
}

/// One pretty-printed JSON file per key.
pub struct FileCacheStore {
    base_dir: PathBuf,
}

impl FileCacheStore {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Readable prefix plus a digest of the raw key, so keys that sanitise
    /// alike still get their own file.
    fn entry_path(&self, key: &str) -> PathBuf {
        let readable: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.base_dir.join(format!("{readable}-{}.json", &digest[..12]))
    }
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> CacheError + '_ {
    move |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(&path)(err)),
        };
        let entry: CacheEntry = serde_json::from_str(&content)?;
        Ok(Some(entry))
    }

    fn put(&self, key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.base_dir).map_err(io_error(&self.base_dir))?;
        let path = self.entry_path(key);
        let json = serde_json::to_string_pretty(entry)?;
        fs::write(&path, json).map_err(io_error(&path))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        let entries = match fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(io_error(&self.base_dir)(err)),
        };
        for entry in entries {
            let path = entry.map_err(io_error(&self.base_dir))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(&path).map_err(io_error(&path))?;
            }
        }
        Ok(())
    }
}

/// A store paired with a fixed time-to-live.
pub struct TtlCache<S> {
    store: S,
    ttl: Duration,
}

impl<S: CacheStore> TtlCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Expired entries are evicted on read.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(entry) = self.store.get(key)? else {
            return Ok(None);
        };
        if entry.is_expired(Utc::now()) {
            tracing::debug!(key = %key, "Cache entry expired");
            self.store.remove(key)?;
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(entry.value)?))
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let now = Utc::now();
        let entry = CacheEntry {
            value: serde_json::to_value(value)?,
            stored_at: now,
            expires_at: now + self.ttl,
        };
        self.store.put(key, &entry)
    }
}
