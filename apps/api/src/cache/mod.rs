//! TTL keyed store used for evaluation results.
//!
//! Entries are visible only while `now < expires_at`. When an insert pushes the store past
//! its capacity, the single entry with the earliest expiry is evicted. Since every entry gets
//! the same TTL this approximates least-recently-set, not least-recently-used.
//!
//! One mutex guards the whole read-check-write of `get`, `set` and eviction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    capacity: usize,
    store: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// A capacity of zero disables storage entirely.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            store: Mutex::new(HashMap::with_capacity(capacity.min(1024))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a clone of the live value, evicting it first if it has expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut store = self.lock();
        let expired = match store.get(key) {
            None => return None,
            Some(entry) => Instant::now() >= entry.expires_at,
        };
        if expired {
            store.remove(key);
            return None;
        }
        store.get(key).map(|entry| entry.value.clone())
    }

    /// Stores `value` until `now + ttl`, then evicts one entry if over capacity.
    pub fn set(&self, key: impl Into<String>, value: V) {
        if self.capacity == 0 {
            return;
        }

        let mut store = self.lock();
        store.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );

        if store.len() > self.capacity {
            // ties broken by key so eviction is deterministic
            let victim = store
                .iter()
                .min_by(|(ka, a), (kb, b)| a.expires_at.cmp(&b.expires_at).then_with(|| ka.cmp(kb)))
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                store.remove(&victim);
                tracing::debug!(capacity = self.capacity, "cache full; evicted earliest-expiring entry");
            }
        }
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
impl<V: Clone> TtlCache<V> {
    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().remove(key).map(|entry| entry.value)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}
