//! Bounded LRU whose entries also expire after a fixed lifetime.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use super::clock::Clock;

/// LRU cache with a per-entry time-to-live.
pub struct ExpiringLru<K: Hash + Eq, V> {
    cache: Mutex<LruCache<K, (V, Instant)>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K: Hash + Eq, V: Clone> ExpiringLru<K, V> {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut cache = self.cache.lock();
        let expired = match cache.peek(key) {
            Some((_, expiry)) => *expiry <= now,
            None => return None,
        };
        if expired {
            cache.pop(key);
            return None;
        }
        cache.get(key).map(|(value, _)| value.clone())
    }

    pub fn put(&self, key: K, value: V) {
        let expiry = self.clock.now() + self.ttl;
        self.cache.lock().put(key, (value, expiry));
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for ExpiringLru<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringLru")
            .field("len", &self.cache.lock().len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
