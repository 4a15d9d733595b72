// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Process-local Cache
//!
//! Small LRU cache with per-entry TTL, shared by the engines for read-path
//! acceleration and for parking short-lived state (unsigned payments
//! between quote and send, swap list pages).
//!
//! Entries are stored as JSON values so callers stay decoupled from each
//! other's types. The cache is best-effort: serialization failures are
//! swallowed and expired or unparsable entries read as misses. Persistent
//! state never lives only here.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Default capacity (entries, across all namespaces).
const DEFAULT_CAPACITY: usize = 1024;

/// Default entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    value: serde_json::Value,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

pub struct CacheService {
    entries: Mutex<LruCache<String, CacheEntry>>,
    default_ttl: Duration,
}

impl Default for CacheService {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl CacheService {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            default_ttl,
        }
    }

    fn full_key(namespace: &str, key: &str) -> String {
        format!("{namespace}:{key}")
    }

    /// Fetch and deserialize an entry. Expired entries are evicted and read
    /// as misses, as do entries that no longer parse as `T`.
    pub fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let full_key = Self::full_key(namespace, key);
        let mut entries = self.entries.lock().ok()?;
        match entries.get(&full_key) {
            Some(entry) if entry.is_expired() => {
                entries.pop(&full_key);
                None
            }
            Some(entry) => serde_json::from_value(entry.value.clone()).ok(),
            None => None,
        }
    }

    /// Insert with the default TTL.
    pub fn set<T: Serialize>(&self, namespace: &str, key: &str, value: &T) {
        self.set_with_ttl(namespace, key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL.
    pub fn set_with_ttl<T: Serialize>(&self, namespace: &str, key: &str, value: &T, ttl: Duration) {
        let Ok(value) = serde_json::to_value(value) else {
            return;
        };
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                Self::full_key(namespace, key),
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                    ttl,
                },
            );
        }
    }

    /// Mutate a live entry in place, keeping its remaining TTL. Returns
    /// `false` when the entry is absent, expired or unparsable, in which
    /// case the caller's next read repopulates from the source of truth.
    pub fn update_in_place<T, F>(&self, namespace: &str, key: &str, mutate: F) -> bool
    where
        T: DeserializeOwned + Serialize,
        F: FnOnce(&mut T),
    {
        let full_key = Self::full_key(namespace, key);
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        let Some(entry) = entries.get_mut(&full_key) else {
            return false;
        };
        if entry.is_expired() {
            entries.pop(&full_key);
            return false;
        }
        let Ok(mut parsed) = serde_json::from_value::<T>(entry.value.clone()) else {
            return false;
        };
        mutate(&mut parsed);
        match serde_json::to_value(&parsed) {
            Ok(value) => {
                entry.value = value;
                true
            }
            Err(_) => false,
        }
    }

    /// Fetch, deserialize and remove an entry in one step.
    pub fn take<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Option<T> {
        let full_key = Self::full_key(namespace, key);
        let mut entries = self.entries.lock().ok()?;
        let entry = entries.pop(&full_key)?;
        if entry.is_expired() {
            return None;
        }
        serde_json::from_value(entry.value).ok()
    }

    pub fn invalidate(&self, namespace: &str, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.pop(&Self::full_key(namespace, key));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_values_per_namespace() {
        let cache = CacheService::default();
        cache.set("balances", "acct-1", &42u64);
        cache.set("swaps", "acct-1", &vec!["a".to_string()]);

        assert_eq!(cache.get::<u64>("balances", "acct-1"), Some(42));
        assert_eq!(
            cache.get::<Vec<String>>("swaps", "acct-1"),
            Some(vec!["a".to_string()])
        );
        assert_eq!(cache.get::<u64>("balances", "acct-2"), None);
    }

    #[test]
    fn expired_entries_read_as_misses() {
        let cache = CacheService::new(16, Duration::from_millis(10));
        cache.set("balances", "acct-1", &1u64);
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get::<u64>("balances", "acct-1"), None);
    }

    #[test]
    fn per_entry_ttl_overrides_the_default() {
        let cache = CacheService::new(16, Duration::from_millis(10));
        cache.set_with_ttl("quotes", "acct-1", &7u64, Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get::<u64>("quotes", "acct-1"), Some(7));
    }

    #[test]
    fn update_in_place_only_touches_live_entries() {
        let cache = CacheService::default();
        assert!(!cache.update_in_place::<Vec<u64>, _>("swaps", "acct-1", |v| v.push(1)));

        cache.set("swaps", "acct-1", &vec![1u64, 2]);
        assert!(cache.update_in_place::<Vec<u64>, _>("swaps", "acct-1", |v| v.insert(0, 0)));
        assert_eq!(cache.get::<Vec<u64>>("swaps", "acct-1"), Some(vec![0, 1, 2]));
    }

    #[test]
    fn take_consumes_the_entry() {
        let cache = CacheService::default();
        cache.set("prepared", "acct-1", &"payload".to_string());
        assert_eq!(cache.take::<String>("prepared", "acct-1"), Some("payload".to_string()));
        assert_eq!(cache.take::<String>("prepared", "acct-1"), None);
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let cache = CacheService::new(2, Duration::from_secs(60));
        cache.set("n", "a", &1u64);
        cache.set("n", "b", &2u64);
        cache.get::<u64>("n", "a");
        cache.set("n", "c", &3u64);

        assert_eq!(cache.get::<u64>("n", "a"), Some(1));
        assert_eq!(cache.get::<u64>("n", "b"), None);
        assert_eq!(cache.get::<u64>("n", "c"), Some(3));
    }
}
