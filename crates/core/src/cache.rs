//! Generic keyed cache with lazy, absolute-time expiry.
//!
//! There is no background sweep: an expired entry is removed the next time
//! its key is read (or on an explicit [`ExpiringCache::clear`]). Memory for
//! expired-but-never-queried keys is therefore reclaimed only on access.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

/// One cached value with its absolute expiry instant.
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Keyed store holding at most one value per key, expiring `ttl` after each
/// write.
///
/// The TTL is fixed at construction and applies uniformly to every key.
/// Concurrent `get`/`set`/`clear` from multiple in-flight requests are safe;
/// the read path only takes the write lock when it has an expired entry to
/// evict.
pub struct ExpiringCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache whose entries live for `ttl` after each `set`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The TTL applied to every entry.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `value` under `key`, unconditionally overwriting any existing
    /// entry and restarting its TTL.
    pub fn set(&self, key: K, value: V) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    /// Return the value for `key` if present and not expired.
    ///
    /// An expired entry is removed before returning `None`; this is the sole
    /// eviction path.
    pub fn get(&self, key: &K) -> Option<V> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if Instant::now() <= entry.expires_at => {
                    return Some(entry.value.clone());
                }
                Some(_) => {} // expired, evict below
                None => return None,
            }
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        // Re-check under the write lock: a concurrent `set` may have replaced
        // the entry since the read lock was released.
        if let Some(entry) = entries.get(key) {
            if Instant::now() <= entry.expires_at {
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Remove one key's entry, or every entry when `key` is `None`.
    pub fn clear(&self, key: Option<&K>) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match key {
            Some(key) => {
                entries.remove(key);
            }
            None => entries.clear(),
        }
    }

    /// All keys currently holding an entry, expired or not.
    ///
    /// Used by cleanup to enumerate live records without walking external
    /// state; callers must still `get` to find out whether a key is live.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_ms: u64) -> ExpiringCache<String, u32> {
        ExpiringCache::new(Duration::from_millis(ttl_ms))
    }

    #[test]
    fn test_get_before_ttl_returns_value() {
        let cache = cache(10_000);
        cache.set("k".to_string(), 7);
        assert_eq!(cache.get(&"k".to_string()), Some(7));
    }

    #[test]
    fn test_get_after_ttl_evicts() {
        let cache = cache(20);
        cache.set("k".to_string(), 7);
        std::thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get(&"k".to_string()), None);
        // The entry was removed, not just hidden.
        assert!(cache.keys().is_empty());
        assert_eq!(cache.get(&"k".to_string()), None);
    }

    #[test]
    fn test_set_overwrites_and_restarts_ttl() {
        let cache = cache(60);
        cache.set("k".to_string(), 1);
        std::thread::sleep(Duration::from_millis(40));
        cache.set("k".to_string(), 2);
        std::thread::sleep(Duration::from_millis(40));

        // 80ms after the first write, but only 40ms after the second.
        assert_eq!(cache.get(&"k".to_string()), Some(2));
    }

    #[test]
    fn test_keys_are_independent() {
        let cache = cache(10_000);
        cache.set("k1".to_string(), 1);
        cache.set("k2".to_string(), 2);

        assert_eq!(cache.get(&"k1".to_string()), Some(1));
        assert_eq!(cache.get(&"k2".to_string()), Some(2));

        cache.clear(Some(&"k1".to_string()));
        assert_eq!(cache.get(&"k1".to_string()), None);
        assert_eq!(cache.get(&"k2".to_string()), Some(2));
    }

    #[test]
    fn test_clear_all() {
        let cache = cache(10_000);
        cache.set("k1".to_string(), 1);
        cache.set("k2".to_string(), 2);

        cache.clear(None);
        assert_eq!(cache.get(&"k1".to_string()), None);
        assert_eq!(cache.get(&"k2".to_string()), None);
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_keys_includes_expired_entries_until_read() {
        let cache = cache(20);
        cache.set("k".to_string(), 1);
        std::thread::sleep(Duration::from_millis(40));

        // Not yet read, so the expired entry still occupies its key.
        assert_eq!(cache.keys(), vec!["k".to_string()]);

        assert_eq!(cache.get(&"k".to_string()), None);
        assert!(cache.keys().is_empty());
    }
}
