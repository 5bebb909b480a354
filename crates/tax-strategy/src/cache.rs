//! Result cache
//!
//! Injected memoization for repeated identical optimization calls. The
//! engine never owns a process-wide cache; callers pick `NoopCache`
//! (per-call confinement) or `TtlCache` (shared across concurrent callers).

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Get/put/clear over serialized results, keyed by serialized inputs.
pub trait ResultCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: String);
    fn clear(&self);
}

/// Cache that never stores anything; every call recomputes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn put(&self, _key: &str, _value: String) {}

    fn clear(&self) {}
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Bounded, time-expiring cache safe to share across threads.
///
/// Eviction is capacity-bounded, not LRU: when full, expired entries are
/// purged first, then an arbitrary entry is dropped.
#[derive(Debug)]
pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

impl ResultCache for TtlCache {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Utc::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn put(&self, key: &str, value: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity && !self.entries.contains_key(key) {
            self.purge_expired();
            if self.entries.len() >= self.capacity {
                let victim = self.entries.iter().next().map(|e| e.key().clone());
                if let Some(victim) = victim {
                    self.entries.remove(&victim);
                }
            }
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_cache_never_hits() {
        let cache = NoopCache;
        cache.put("k", "v".to_string());
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_ttl_cache_round_trip() {
        let cache = TtlCache::new(4, Duration::minutes(5));
        cache.put("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));
        cache.clear();
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn test_ttl_cache_expires() {
        let cache = TtlCache::new(4, Duration::milliseconds(-1));
        cache.put("k", "v".to_string());
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_cache_is_bounded() {
        let cache = TtlCache::new(2, Duration::minutes(5));
        cache.put("a", "1".to_string());
        cache.put("b", "2".to_string());
        cache.put("c", "3".to_string());
        assert!(cache.len() <= 2);
    }
}
