//! The default in-process cache backend: an LRU map guarded by a mutex,
//! with a TTL attached to every entry.

use std::fmt::Display;
use std::time::Duration;

use lru_cache::LruCache;
use parking_lot::Mutex;

use super::CacheEntry;

/// Error raised by a cache backend operation.
///
/// Callers (the orchestrator in particular) must treat any error from a
/// cache backend as a cache miss and continue; a failing cache never fails
/// a verification.
#[derive(Debug, Clone)]
pub struct CacheError(pub String);

impl Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cache error: {}", self.0)
    }
}

impl std::error::Error for CacheError {}

/// The contract a cache backend must satisfy for one named store.
///
/// The in-process [`CacheStore`] is the default and only implementation
/// shipped here; alternative backends (e.g. an external key-value store)
/// are plugged in by implementing this trait and substituting it into the
/// [`super::Cache`] registry.
pub trait CacheBackend<T: Clone + Send + 'static>: Send + Sync {
    /// Look up `key`. Returns `Ok(None)` for an unknown or expired key.
    fn get(&self, key: &str) -> Result<Option<T>, CacheError>;
    /// Insert or replace `key`, resetting its LRU recency. `ttl` overrides
    /// the store's default TTL when supplied.
    fn set(&self, key: &str, value: T, ttl: Option<Duration>) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
    fn has(&self, key: &str) -> Result<bool, CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
    fn size(&self) -> Result<usize, CacheError>;
}

/// Default in-process implementation: an [`LruCache`] of [`CacheEntry`],
/// guarded by a `parking_lot` mutex. Capacity is a soft ceiling - the
/// underlying LRU map evicts the least-recently-used entry before an
/// insertion that would exceed it.
pub struct CacheStore<T> {
    inner: Mutex<LruCache<String, CacheEntry<T>>>,
    default_ttl: Duration,
}

impl<T: Clone> CacheStore<T> {
    #[must_use]
    pub fn new(default_ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            default_ttl,
        }
    }
}

impl<T: Clone + Send + 'static> CacheBackend<T> for CacheStore<T> {
    fn get(&self, key: &str) -> Result<Option<T>, CacheError> {
        let mut guard = self.inner.lock();
        match guard.get_mut(key) {
            Some(entry) if !entry.is_expired() => Ok(Some(entry.value.clone())),
            Some(_expired) => {
                guard.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: T, ttl: Option<Duration>) -> Result<(), CacheError> {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let mut guard = self.inner.lock();
        guard.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.lock().remove(key);
        Ok(())
    }

    fn has(&self, key: &str) -> Result<bool, CacheError> {
        let mut guard = self.inner.lock();
        match guard.get_mut(key) {
            Some(entry) if !entry.is_expired() => Ok(true),
            Some(_expired) => {
                guard.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        self.inner.lock().clear();
        Ok(())
    }

    fn size(&self) -> Result<usize, CacheError> {
        Ok(self.inner.lock().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn round_trips_until_ttl_expiry() {
        let store: CacheStore<u32> = CacheStore::new(Duration::from_millis(20), 10);
        store.set("k", 42, None).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(42));
        thread::sleep(Duration::from_millis(40));
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn evicts_lru_on_overflow() {
        let store: CacheStore<u32> = CacheStore::new(Duration::from_secs(60), 2);
        store.set("a", 1, None).unwrap();
        store.set("b", 2, None).unwrap();
        // touch "a" so "b" becomes the least-recently-used entry
        let _ = store.get("a").unwrap();
        store.set("c", 3, None).unwrap();
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.get("a").unwrap(), Some(1));
        assert_eq!(store.get("c").unwrap(), Some(3));
    }

    #[test]
    fn explicit_ttl_overrides_default() {
        let store: CacheStore<u32> = CacheStore::new(Duration::from_secs(60), 10);
        store.set("k", 1, Some(Duration::from_millis(10))).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn clear_empties_store() {
        let store: CacheStore<u32> = CacheStore::new(Duration::from_secs(60), 10);
        store.set("a", 1, None).unwrap();
        store.set("b", 2, None).unwrap();
        store.clear().unwrap();
        assert_eq!(store.size().unwrap(), 0);
    }
}
