//! Keyed TTL store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::key::CacheKey;
use crate::snapshot::{CacheSnapshot, SnapshotEntry};

/// Status of a cache lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Live entry served from the cache.
    Hit,
    /// No live entry; the value was fetched.
    Miss,
    /// Caching disabled for this lookup.
    Bypass,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => write!(f, "HIT"),
            Self::Miss => write!(f, "MISS"),
            Self::Bypass => write!(f, "BYPASS"),
        }
    }
}

/// A stored value with its expiry metadata.
///
/// Entries are never mutated; storing under an existing key replaces the
/// whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The key this entry is stored under.
    pub key: CacheKey,
    /// The cached value.
    pub value: V,
    /// Monotonic store time, used for expiry.
    pub stored_at: Instant,
    /// Wall-clock store time, carried into snapshots.
    pub stored_at_utc: DateTime<Utc>,
    /// Time-to-live.
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn new(key: CacheKey, value: V, ttl: Duration) -> Self {
        Self {
            key,
            value,
            stored_at: Instant::now(),
            stored_at_utc: Utc::now(),
            ttl,
        }
    }

    /// Check if the entry has expired at `now` (`now > stored_at + ttl`).
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.stored_at + self.ttl
    }

    /// Check if the entry has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Remaining lifetime, zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        (self.stored_at + self.ttl).saturating_duration_since(Instant::now())
    }

    /// Age of the entry.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.stored_at)
    }
}

/// Selects entries to invalidate.
pub enum KeyMatch<'a> {
    /// A single exact key.
    Exact(&'a CacheKey),
    /// Every key for which the predicate returns true.
    Predicate(&'a dyn Fn(&CacheKey) -> bool),
}

impl<'a> From<&'a CacheKey> for KeyMatch<'a> {
    fn from(key: &'a CacheKey) -> Self {
        Self::Exact(key)
    }
}

/// In-memory keyed store with lazy TTL expiry.
///
/// Every operation takes the internal lock once and never suspends, so a
/// `DataCache` can be shared by `Arc` across tasks and threads.
pub struct DataCache<V> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<V>>>,
}

impl<V> Default for DataCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for DataCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("len", &self.lock().len())
            .finish()
    }
}

impl<V> DataCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a value, replacing any existing entry for the key.
    pub fn set(&self, key: CacheKey, value: V, ttl: Duration) {
        let entry = CacheEntry::new(key.clone(), value, ttl);
        self.lock().insert(key, entry);
    }

    /// Check whether a live entry exists, removing it if expired.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Remove entries matching `target`, returning how many were removed.
    pub fn invalidate<'a>(&self, target: impl Into<KeyMatch<'a>>) -> usize {
        let mut entries = self.lock();
        let removed = match target.into() {
            KeyMatch::Exact(key) => usize::from(entries.remove(key).is_some()),
            KeyMatch::Predicate(matches) => {
                let before = entries.len();
                entries.retain(|key, _| !matches(key));
                before - entries.len()
            }
        };
        debug!(removed, "cache entries invalidated");
        removed
    }

    /// Remove every entry whose key matches the predicate.
    pub fn invalidate_where(&self, matches: impl Fn(&CacheKey) -> bool) -> usize {
        self.invalidate(KeyMatch::Predicate(&matches))
    }

    /// Remove all entries, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Remove every expired entry.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        before - entries.len()
    }

    /// Number of stored entries, including ones not yet lazily expired.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keys of all live entries.
    pub fn keys(&self) -> Vec<CacheKey> {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.key.clone())
            .collect()
    }
}

impl<V: Clone> DataCache<V> {
    /// Get a live value. Expired entries are removed and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.entry(key).map(|entry| entry.value)
    }

    /// Get a live entry with its metadata.
    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry<V>> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                debug!(key = %key, "cache entry expired");
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Capture every live entry with its remaining TTL.
    pub fn snapshot(&self) -> CacheSnapshot<V> {
        let now = Instant::now();
        let entries = self.lock();
        let mut snapshot = CacheSnapshot::new();
        for entry in entries.values().filter(|e| !e.is_expired_at(now)) {
            snapshot.insert(
                &entry.key,
                SnapshotEntry {
                    value: entry.value.clone(),
                    stored_at: entry.stored_at_utc,
                    ttl_ms: (entry.stored_at + entry.ttl)
                        .saturating_duration_since(now)
                        .as_millis() as u64,
                },
            );
        }
        snapshot
    }
}

impl<V> DataCache<V> {
    /// Seed the cache from a snapshot, returning how many entries were stored.
    ///
    /// Each entry lives for the TTL it had left when the snapshot was taken.
    /// Entries with unparseable keys or no remaining TTL are skipped.
    pub fn restore(&self, snapshot: CacheSnapshot<V>) -> usize {
        let mut restored = 0;
        for (serialized, entry) in snapshot.into_entries() {
            if entry.ttl_ms == 0 {
                continue;
            }
            match CacheKey::parse(&serialized) {
                Ok(key) => {
                    self.set(key, entry.value, Duration::from_millis(entry.ttl_ms));
                    restored += 1;
                }
                Err(e) => debug!(error = %e, "skipping snapshot entry"),
            }
        }
        restored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_key;

    #[test]
    fn test_set_then_get() {
        let cache = DataCache::new();
        cache.set(cache_key!("user", 7), 42u32, Duration::from_secs(60));

        assert_eq!(cache.get(&cache_key!("user", 7)), Some(42));
        assert_eq!(cache.get(&cache_key!("user", 8)), None);
    }

    #[test]
    fn test_set_replaces_entry() {
        let cache = DataCache::new();
        let key = cache_key!("user", 7);
        cache.set(key.clone(), "old", Duration::from_secs(60));
        cache.set(key.clone(), "new", Duration::from_secs(60));

        assert_eq!(cache.get(&key), Some("new"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = DataCache::new();
        let key = cache_key!("user", 7);
        cache.set(key.clone(), "ada", Duration::from_secs(5));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get(&key), Some("ada"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get(&key), None);
        // Removed lazily on the read above.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contains_and_keys_skip_expired() {
        let cache = DataCache::new();
        cache.set(cache_key!("a"), 1, Duration::from_secs(1));
        cache.set(cache_key!("b"), 2, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert!(!cache.contains(&cache_key!("a")));
        assert!(cache.contains(&cache_key!("b")));
        assert_eq!(cache.keys(), vec![cache_key!("b")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = DataCache::new();
        cache.set(cache_key!("a"), 1, Duration::from_secs(1));
        cache.set(cache_key!("b"), 2, Duration::from_secs(1));
        cache.set(cache_key!("c"), 3, Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_exact() {
        let cache = DataCache::new();
        let key = cache_key!("user", 7);
        cache.set(key.clone(), 1, Duration::from_secs(60));

        assert_eq!(cache.invalidate(&key), 1);
        assert_eq!(cache.invalidate(&key), 0);
        assert_eq!(cache.get(&key), None);
    }

    #[test]
    fn test_invalidate_predicate() {
        let cache = DataCache::new();
        cache.set(cache_key!("user", 1), 1, Duration::from_secs(60));
        cache.set(cache_key!("user", 2), 2, Duration::from_secs(60));
        cache.set(cache_key!("post", 1), 3, Duration::from_secs(60));

        let removed = cache.invalidate_where(|key| key.starts_with(&["user"]));

        assert_eq!(removed, 2);
        assert_eq!(cache.get(&cache_key!("post", 1)), Some(3));
    }

    #[test]
    fn test_invalidate_substring() {
        let cache = DataCache::new();
        cache.set(CacheKey::single("https://api/users/1"), 1, Duration::from_secs(60));
        cache.set(CacheKey::single("https://api/posts/1"), 2, Duration::from_secs(60));

        assert_eq!(cache.invalidate_where(|key| key.contains("/users/")), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = DataCache::new();
        cache.set(cache_key!("a"), 1, Duration::from_secs(60));
        cache.set(cache_key!("b"), 2, Duration::from_secs(60));

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(CacheStatus::Hit.to_string(), "HIT");
        assert_eq!(CacheStatus::Miss.to_string(), "MISS");
        assert_eq!(CacheStatus::Bypass.to_string(), "BYPASS");
    }
}
