//! Transferable cache snapshots.
//!
//! A snapshot maps the serialized form of each [`CacheKey`] to the cached
//! value plus the lifetime it had left. The server renders one into the HTML
//! response and the client restores it before any lookup.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::CacheResult;
use crate::key::CacheKey;

/// One entry of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry<V> {
    /// The cached value.
    pub value: V,
    /// When the entry was originally stored.
    pub stored_at: DateTime<Utc>,
    /// Remaining TTL in milliseconds when the snapshot was taken.
    pub ttl_ms: u64,
}

/// Serializable form of a [`crate::DataCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot<V> {
    entries: BTreeMap<String, SnapshotEntry<V>>,
}

impl<V> Default for CacheSnapshot<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> CacheSnapshot<V> {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add an entry.
    pub fn insert(&mut self, key: &CacheKey, entry: SnapshotEntry<V>) {
        self.entries.insert(key.serialized(), entry);
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &CacheKey) -> Option<&SnapshotEntry<V>> {
        self.entries.get(&key.serialized())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into `(serialized key, entry)` pairs.
    pub fn into_entries(self) -> impl Iterator<Item = (String, SnapshotEntry<V>)> {
        self.entries.into_iter()
    }
}

impl<V: Serialize> CacheSnapshot<V> {
    /// Serialize to plain JSON.
    pub fn to_json(&self) -> CacheResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to JSON that is safe to place inside a `<script>` element.
    pub fn to_script_json(&self) -> CacheResult<String> {
        Ok(escape_for_script(&self.to_json()?))
    }
}

impl<V: DeserializeOwned> CacheSnapshot<V> {
    /// Parse a snapshot. Accepts both plain and script-escaped JSON.
    pub fn from_json(json: &str) -> CacheResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Escape `<`, `>` and `/` as unicode sequences so embedded JSON cannot
/// terminate the surrounding script element.
///
/// Outside string literals JSON never contains these characters, so the
/// result is still valid JSON with the same meaning.
pub fn escape_for_script(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => escaped.push_str("\\u003c"),
            '>' => escaped.push_str("\\u003e"),
            '/' => escaped.push_str("\\u002f"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{json, Value};

    use super::*;
    use crate::{cache_key, DataCache};

    #[test]
    fn test_escape_for_script() {
        assert_eq!(
            escape_for_script(r#"{"a":"</script><b>"}"#),
            r#"{"a":"\u003c\u002fscript\u003e\u003cb\u003e"}"#
        );
    }

    #[test]
    fn test_escaped_json_parses_to_same_value() {
        let original = json!({"html": "</script>", "url": "https://a/b"});
        let escaped = escape_for_script(&original.to_string());

        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('/'));
        let parsed: Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_snapshot_keys_are_serialized_cache_keys() {
        let cache = DataCache::new();
        cache.set(cache_key!("user", 7), json!({"id": 7}), Duration::from_secs(60));

        let snapshot = cache.snapshot();
        let raw: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();

        let entry = &raw[r#"["user","7"]"#];
        assert_eq!(entry["value"], json!({"id": 7}));
        assert!(entry["ttlMs"].as_u64().unwrap() <= 60_000);
        assert!(entry["storedAt"].is_string());
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let server = DataCache::new();
        let value = json!({"$type": "UserProfilePage", "id": 7, "bio": "</script>"});
        server.set(cache_key!("user", 7), value.clone(), Duration::from_secs(300));

        let script = server.snapshot().to_script_json().unwrap();
        let client: DataCache<Value> = DataCache::new();
        let restored = client.restore(CacheSnapshot::from_json(&script).unwrap());

        assert_eq!(restored, 1);
        assert_eq!(client.get(&cache_key!("user", 7)), Some(value));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_skips_expired_entries() {
        let cache = DataCache::new();
        cache.set(cache_key!("old"), 1, Duration::from_secs(1));
        cache.set(cache_key!("new"), 2, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(2)).await;

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(&cache_key!("new")).is_some());
    }

    #[test]
    fn test_restore_skips_bad_keys() {
        let json = r#"{"not-a-key":{"value":1,"storedAt":"2024-01-01T00:00:00Z","ttlMs":1000}}"#;
        let cache: DataCache<i32> = DataCache::new();

        assert_eq!(cache.restore(CacheSnapshot::from_json(json).unwrap()), 0);
        assert!(cache.is_empty());
    }
}
