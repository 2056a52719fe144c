//! In-memory response store with lazy expiry.

use super::key::CacheKey;
use super::stats::{AtomicStats, CacheStats};
use crate::types::GatewayResponse;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Freshness window applied to read-style results.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub freshness_window: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// A previously observed successful result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub result: GatewayResponse,
    pub stored_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self, window: Duration) -> bool {
        self.stored_at.elapsed() >= window
    }
}

/// Keyed table of successful read-style results.
///
/// Stale entries stay in the table until a read finds them or a newer result
/// overwrites them; there is no background sweep.
pub struct CacheStore {
    config: CacheConfig,
    entries: RwLock<HashMap<String, CacheEntry>>,
    stats: AtomicStats,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            stats: AtomicStats::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Fetch a fresh entry. A stale entry counts as a miss and is removed.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.config.enabled {
            return None;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key.as_str()).cloned() {
            Some(entry) if entry.is_stale(self.config.freshness_window) => {
                entries.remove(key.as_str());
                AtomicStats::bump(&self.stats.invalidations);
                AtomicStats::bump(&self.stats.misses);
                debug!(operation = %key.operation, "cache entry stale, dropped");
                None
            }
            Some(entry) => {
                AtomicStats::bump(&self.stats.hits);
                Some(entry)
            }
            None => {
                AtomicStats::bump(&self.stats.misses);
                None
            }
        }
    }

    /// Store a result, replacing any previous entry for the key.
    pub fn put(&self, key: &CacheKey, result: GatewayResponse) {
        if !self.config.enabled {
            return;
        }
        let entry = CacheEntry {
            result,
            stored_at: Instant::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.hash.clone(), entry);
        AtomicStats::bump(&self.stats.stores);
    }

    /// Drop the entry for `key`. Returns whether one was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key.as_str())
            .is_some();
        if removed {
            AtomicStats::bump(&self.stats.invalidations);
        }
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of entries that are still fresh.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|e| !e.is_stale(self.config.freshness_window))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.to_stats()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(id: &str) -> CacheKey {
        CacheKey::for_call("GET_QUEUE", &json!({ "id": id }))
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entry_is_served() {
        let store = CacheStore::default();
        store.put(&key("abc"), GatewayResponse::success(json!([1, 2])));
        tokio::time::advance(Duration::from_millis(4999)).await;
        let hit = store.get(&key("abc")).expect("fresh entry");
        assert_eq!(hit.result.data, Some(json!([1, 2])));
        assert_eq!(store.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_read_misses_and_removes() {
        let store = CacheStore::default();
        store.put(&key("abc"), GatewayResponse::success(json!(1)));
        tokio::time::advance(Duration::from_millis(5000)).await;
        assert!(store.get(&key("abc")).is_none());
        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.invalidations, 1);
        assert!(!store.invalidate(&key("abc")), "entry already removed");
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_and_restarts_window() {
        let store = CacheStore::default();
        store.put(&key("abc"), GatewayResponse::success(json!("old")));
        tokio::time::advance(Duration::from_millis(3000)).await;
        store.put(&key("abc"), GatewayResponse::success(json!("new")));
        tokio::time::advance(Duration::from_millis(3000)).await;
        let hit = store.get(&key("abc")).expect("overwritten entry is fresh");
        assert_eq!(hit.result.data, Some(json!("new")));
    }

    #[tokio::test(start_paused = true)]
    async fn len_ignores_stale_entries_without_removing_them() {
        let store = CacheStore::default();
        store.put(&key("a"), GatewayResponse::success(json!(1)));
        tokio::time::advance(Duration::from_millis(6000)).await;
        store.put(&key("b"), GatewayResponse::success(json!(2)));
        assert_eq!(store.len(), 1);
        assert!(store.invalidate(&key("a")), "stale entry lingers until read");
    }

    #[tokio::test]
    async fn disabled_cache_never_stores() {
        let store = CacheStore::new(CacheConfig::new().with_enabled(false));
        store.put(&key("abc"), GatewayResponse::success(json!(1)));
        assert!(store.get(&key("abc")).is_none());
        assert!(store.is_empty());
        assert_eq!(store.stats(), CacheStats::default());
    }
}
