//! In-memory response storage shared across one session.

use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::CacheError;
use super::key::CacheKey;

/// A single cached response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedEntry {
  /// Serialized JSON body as returned by the remote
  pub body: String,
  /// When the body was written
  pub cached_at: DateTime<Utc>,
}

/// Mapping from cache key to serialized response body.
///
/// Unbounded unless built with a capacity, in which case the least recently
/// read or written entry is dropped first.
pub struct ResponseCache {
  entries: LruCache<CacheKey, CachedEntry>,
}

impl ResponseCache {
  pub fn unbounded() -> Self {
    Self {
      entries: LruCache::unbounded(),
    }
  }

  pub fn with_capacity(capacity: NonZeroUsize) -> Self {
    Self {
      entries: LruCache::new(capacity),
    }
  }

  /// Build from an optional capacity; `None` or zero means unbounded.
  pub fn from_capacity(capacity: Option<usize>) -> Self {
    match capacity.and_then(NonZeroUsize::new) {
      Some(capacity) => Self::with_capacity(capacity),
      None => Self::unbounded(),
    }
  }

  /// Look up an entry and mark it recently used.
  pub fn get(&mut self, key: &CacheKey) -> Option<&CachedEntry> {
    self.entries.get(key)
  }

  /// Look up an entry without touching recency.
  pub fn peek(&self, key: &CacheKey) -> Option<&CachedEntry> {
    self.entries.peek(key)
  }

  pub fn set(&mut self, key: CacheKey, body: String) {
    let entry = CachedEntry {
      body,
      cached_at: Utc::now(),
    };
    if let Some((evicted, _)) = self.entries.push(key.clone(), entry) {
      if evicted != key {
        tracing::debug!(key = %evicted, "evicted least recently used entry");
      }
    }
  }

  /// Remove an entry. Returns true if it was present.
  pub fn delete(&mut self, key: &CacheKey) -> bool {
    self.entries.pop(key).is_some()
  }

  /// Keys currently held, most recently used first.
  pub fn keys(&self) -> Vec<CacheKey> {
    self.entries.iter().map(|(key, _)| key.clone()).collect()
  }

  pub fn clear(&mut self) {
    self.entries.clear();
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

impl Default for ResponseCache {
  fn default() -> Self {
    Self::unbounded()
  }
}

/// Handle to the session's response cache.
///
/// Cloning shares the same storage. Readers outside the crate get read-only
/// access; writes go through the cache layer and the maintainer.
#[derive(Clone, Default)]
pub struct SharedCache {
  inner: Arc<Mutex<ResponseCache>>,
}

impl SharedCache {
  pub fn new(cache: ResponseCache) -> Self {
    Self {
      inner: Arc::new(Mutex::new(cache)),
    }
  }

  /// Lock the storage. Never hold the guard across an await point.
  pub(crate) fn lock(&self) -> Result<MutexGuard<'_, ResponseCache>, CacheError> {
    self.inner.lock().map_err(|_| CacheError::LockPoisoned)
  }

  pub fn keys(&self) -> Result<Vec<CacheKey>, CacheError> {
    Ok(self.lock()?.keys())
  }

  pub fn len(&self) -> Result<usize, CacheError> {
    Ok(self.lock()?.len())
  }

  pub fn is_empty(&self) -> Result<bool, CacheError> {
    Ok(self.lock()?.is_empty())
  }

  pub fn contains(&self, key: &CacheKey) -> Result<bool, CacheError> {
    Ok(self.lock()?.peek(key).is_some())
  }

  /// Copy of an entry, without touching recency.
  pub fn peek(&self, key: &CacheKey) -> Result<Option<CachedEntry>, CacheError> {
    Ok(self.lock()?.peek(key).cloned())
  }
}
