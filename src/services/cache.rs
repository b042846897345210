// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory TTL cache for computed briefings.
//!
//! Entries expire lazily: an expired entry is dropped when it is next looked
//! up or when another key is inserted, never by a background sweep. The last
//! value per key is remembered so callers can show it while a fresh
//! computation is failing; at most [`MAX_STALE_ENTRIES`] such values are
//! kept, oldest dropped first.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stale values retained across all keys.
pub const MAX_STALE_ENTRIES: usize = 32;

#[derive(Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

#[derive(Clone)]
struct StaleEntry<V> {
    value: V,
    /// Eviction order; lower is older.
    seq: u64,
}

/// TTL cache with one slot per key. Cheap to clone; clones share entries.
#[derive(Clone)]
pub struct RefreshCache<K, V> {
    entries: Arc<DashMap<K, CacheEntry<V>>>,
    /// Values evicted on expiry, kept until the key is recomputed.
    expired: Arc<DashMap<K, StaleEntry<V>>>,
    evictions: Arc<AtomicU64>,
}

impl<K, V> Default for RefreshCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RefreshCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            expired: Arc::new(DashMap::new()),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fresh value for `key`, evicting it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Utc::now();
        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                return Some(entry.value.clone());
            }
        }

        if let Some((key, entry)) = self.entries.remove_if(key, |_, e| now >= e.expires_at) {
            self.retire(key, entry.value);
        }
        None
    }

    fn retire(&self, key: K, value: V) {
        self.expired.insert(
            key,
            StaleEntry {
                value,
                seq: self.evictions.fetch_add(1, Ordering::Relaxed),
            },
        );

        while self.expired.len() > MAX_STALE_ENTRIES {
            let oldest = self
                .expired
                .iter()
                .min_by_key(|entry| entry.seq)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.expired.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Move every expired entry to the stale map.
    fn retire_expired(&self) {
        let now = Utc::now();
        let keys: Vec<K> = self
            .entries
            .iter()
            .filter(|entry| now >= entry.expires_at)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            if let Some((key, entry)) = self.entries.remove_if(&key, |_, e| now >= e.expires_at) {
                self.retire(key, entry.value);
            }
        }
    }

    /// Return the cached value, or compute, store and return a new one.
    ///
    /// `force` skips the lookup but still stores the result. Errors from
    /// `compute` are returned and nothing is cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: K,
        ttl: Duration,
        force: bool,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !force {
            if let Some(value) = self.get(&key) {
                return Ok(value);
            }
        }

        let value = compute().await?;
        self.insert(key, value.clone(), ttl);
        Ok(value)
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        self.retire_expired();
        self.expired.remove(&key);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Utc::now() + ttl,
            },
        );
    }

    /// Last value stored for `key`, fresh or not.
    pub fn stale(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .map(|entry| entry.value.clone())
            .or_else(|| self.expired.get(key).map(|entry| entry.value.clone()))
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.expired.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn counted(
        cache: &RefreshCache<&'static str, usize>,
        calls: &AtomicUsize,
        ttl: Duration,
        force: bool,
    ) -> usize {
        cache
            .get_or_compute("today", ttl, force, || async {
                Ok::<_, ()>(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_compute_runs_once_within_ttl() {
        let cache = RefreshCache::new();
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&cache, &calls, Duration::minutes(15), false).await, 1);
        assert_eq!(counted(&cache, &calls, Duration::minutes(15), false).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_compute_runs_again_after_expiry() {
        let cache = RefreshCache::new();
        let calls = AtomicUsize::new(0);

        // Zero TTL: the entry is already expired on the next lookup.
        assert_eq!(counted(&cache, &calls, Duration::zero(), false).await, 1);
        assert_eq!(counted(&cache, &calls, Duration::zero(), false).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_lookup() {
        let cache: RefreshCache<&str, u32> = RefreshCache::new();
        cache.insert("k", 7, Duration::seconds(-1));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
        assert_eq!(cache.stale(&"k"), Some(7));
    }

    #[tokio::test]
    async fn test_force_bypasses_lookup_but_stores_result() {
        let cache = RefreshCache::new();
        let calls = AtomicUsize::new(0);

        assert_eq!(counted(&cache, &calls, Duration::minutes(15), false).await, 1);
        assert_eq!(counted(&cache, &calls, Duration::minutes(15), true).await, 2);
        assert_eq!(counted(&cache, &calls, Duration::minutes(15), false).await, 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: RefreshCache<&str, u32> = RefreshCache::new();

        let result: Result<u32, &str> = cache
            .get_or_compute("k", Duration::minutes(5), false, || async { Err("boom") })
            .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(cache.get(&"k"), None);

        let result: Result<u32, &str> = cache
            .get_or_compute("k", Duration::minutes(5), false, || async { Ok(3) })
            .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let cache: RefreshCache<&str, u32> = RefreshCache::new();
        cache.insert("a", 1, Duration::minutes(5));
        cache.insert("b", 2, Duration::seconds(-5));
        let _ = cache.get(&"b");

        cache.clear();
        assert_eq!(cache.stale(&"a"), None);
        assert_eq!(cache.stale(&"b"), None);
    }

    #[tokio::test]
    async fn test_insert_retires_other_expired_entries() {
        let cache: RefreshCache<u32, u32> = RefreshCache::new();
        cache.insert(1, 10, Duration::seconds(-1));
        cache.insert(2, 20, Duration::minutes(5));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stale(&1), Some(10));
        assert_eq!(cache.get(&2), Some(20));
    }

    #[tokio::test]
    async fn test_stale_values_are_bounded() {
        let cache: RefreshCache<usize, usize> = RefreshCache::new();
        let total = MAX_STALE_ENTRIES + 10;
        for key in 0..total {
            cache.insert(key, key, Duration::seconds(-1));
        }
        cache.insert(total, total, Duration::minutes(5));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.expired.len(), MAX_STALE_ENTRIES);
        assert_eq!(cache.stale(&(total - 1)), Some(total - 1));
    }
}
