//! Execution Cache (C6): LRU + TTL map keyed by a stable hash of
//! `(code-body, canonicalized-context, tool-versions)`.

use chrono::Utc;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use taskgraph_common::{CacheEntry, TaskResult};
use tracing::instrument;

/// Builds the stable cache key for a `(code, context, tool_versions)` triple.
/// Distinct tool-version maps always produce distinct keys.
pub fn cache_key(code: &str, context: &str, tool_versions: &HashMap<String, String>) -> String {
    let ordered: BTreeMap<_, _> = tool_versions.iter().collect();
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hasher.update(b"\0");
    hasher.update(context.as_bytes());
    hasher.update(b"\0");
    for (tool, version) in ordered {
        hasher.update(tool.as_bytes());
        hasher.update(b"=");
        hasher.update(version.as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub current_entries: usize,
    pub total_saved_ms: u64,
}

struct Inner {
    entries: HashMap<String, CacheEntry>,
    /// Access order, oldest first; the front is the LRU eviction candidate.
    lru: Vec<String>,
    stats: CacheStats,
}

/// In-memory execution cache, bounded by `max_entries`, with a per-entry TTL.
pub struct ExecutionCache {
    enabled: bool,
    max_entries: usize,
    ttl_seconds: i64,
    inner: Mutex<Inner>,
}

impl ExecutionCache {
    pub fn new(enabled: bool, max_entries: usize, ttl_seconds: u64) -> Self {
        Self {
            enabled,
            max_entries,
            ttl_seconds: ttl_seconds as i64,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                lru: Vec::new(),
                stats: CacheStats::default(),
            }),
        }
    }

    #[instrument(skip(self))]
    pub fn get(&self, key: &str) -> Option<TaskResult> {
        if !self.enabled {
            return None;
        }
        let mut inner = self.inner.lock();
        let expired = inner
            .entries
            .get(key)
            .map(|e| e.expires_at < Utc::now())
            .unwrap_or(false);
        if expired {
            inner.entries.remove(key);
            inner.lru.retain(|k| k != key);
            inner.stats.misses += 1;
            inner.stats.current_entries = inner.entries.len();
            return None;
        }
        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.hit_count += 1;
                let result = entry.result.clone();
                let saved = result.execution_time_ms.unwrap_or(0);
                inner.lru.retain(|k| k != key);
                inner.lru.push(key.to_string());
                inner.stats.hits += 1;
                inner.stats.total_saved_ms += saved;
                Some(result)
            }
            None => {
                inner.stats.misses += 1;
                None
            }
        }
    }

    #[instrument(skip(self, result, tool_versions))]
    pub fn set(
        &self,
        key: String,
        result: TaskResult,
        tool_versions: HashMap<String, String>,
    ) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        let now = Utc::now();
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                key: key.clone(),
                result,
                tool_versions,
                created_at: now,
                expires_at: now + chrono::Duration::seconds(self.ttl_seconds),
                hit_count: 0,
            },
        );
        inner.lru.retain(|k| k != &key);
        inner.lru.push(key);

        while inner.lru.len() > self.max_entries {
            let oldest = inner.lru.remove(0);
            inner.entries.remove(&oldest);
        }
        inner.stats.current_entries = inner.entries.len();
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.lru.clear();
        inner.stats.current_entries = 0;
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> TaskResult {
        TaskResult::success("t1", json!(1), 100)
    }

    #[test]
    fn distinct_tool_versions_produce_distinct_keys() {
        let mut v1 = HashMap::new();
        v1.insert("code".to_string(), "1.0".to_string());
        let mut v2 = HashMap::new();
        v2.insert("code".to_string(), "2.0".to_string());
        assert_ne!(cache_key("fn() {}", "ctx", &v1), cache_key("fn() {}", "ctx", &v2));
    }

    #[test]
    fn set_then_get_hits() {
        let cache = ExecutionCache::new(true, 10, 60);
        cache.set("k1".to_string(), result(), HashMap::new());
        assert!(cache.get("k1").is_some());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn disabled_cache_always_misses() {
        let cache = ExecutionCache::new(false, 10, 60);
        cache.set("k1".to_string(), result(), HashMap::new());
        assert!(cache.get("k1").is_none());
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = ExecutionCache::new(true, 10, 0);
        cache.set("k1".to_string(), result(), HashMap::new());
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.get("k1").is_none());
    }

    #[test]
    fn lru_eviction_removes_oldest_accessed() {
        let cache = ExecutionCache::new(true, 3, 60);
        cache.set("k1".to_string(), result(), HashMap::new());
        cache.set("k2".to_string(), result(), HashMap::new());
        cache.set("k3".to_string(), result(), HashMap::new());
        cache.set("k4".to_string(), result(), HashMap::new());
        assert!(cache.get("k1").is_none());
        assert!(cache.get("k3").is_some());
    }

    #[test]
    fn clear_resets_entries_but_not_stats() {
        let cache = ExecutionCache::new(true, 10, 60);
        cache.set("k1".to_string(), result(), HashMap::new());
        cache.get("k1");
        cache.clear();
        assert_eq!(cache.stats().current_entries, 0);
        assert_eq!(cache.stats().hits, 1);
    }
}
