//! Time-to-live cache keyed by composite strings.
//!
//! Entries expire lazily: a read past expiry removes the entry and reports a
//! miss. Once the map grows past its sweep threshold, inserts also sweep out
//! entries that have already expired. Live entries are never evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::clock::Clock;

/// A cached value and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expiry: Instant,
}

/// In-memory TTL cache.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    clock: Arc<dyn Clock>,
    sweep_threshold: usize,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(clock: Arc<dyn Clock>, sweep_threshold: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            sweep_threshold,
        }
    }

    /// Returns the live value for `key`, purging it if expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expiry > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                expiry: now + ttl,
            },
        );
        if entries.len() > self.sweep_threshold {
            let swept = Self::sweep_expired(&mut entries, now);
            tracing::debug!("Cache sweep removed {} expired entries", swept);
        }
    }

    /// Atomically replaces the value for `key` with `update(current)`.
    ///
    /// A live entry keeps its expiry; a missing or expired one gets `ttl`.
    pub fn update<F>(&self, key: &str, ttl: Duration, update: F) -> V
    where
        F: FnOnce(Option<V>) -> V,
    {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let live = entries.get(key).filter(|entry| entry.expiry > now).cloned();
        let expiry = live.as_ref().map_or(now + ttl, |entry| entry.expiry);
        let value = update(live.map(|entry| entry.value));
        entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.clone(),
                expiry,
            },
        );
        value
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.lock().remove(key).map(|entry| entry.value)
    }

    /// Removes every entry whose key starts with `prefix`.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Removes already-expired entries and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        Self::sweep_expired(&mut self.entries.lock(), now)
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn sweep_expired(entries: &mut HashMap<String, CacheEntry<V>>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.expiry > now);
        before - entries.len()
    }
}
