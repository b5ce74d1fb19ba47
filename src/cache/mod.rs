//! Result cache (C14): TTL-keyed cache over query fingerprints, generalized
//! from the teacher's `query::cache::QueryCache` (`lru::LruCache` + hit/miss
//! counters) with a per-entry expiry stamp so eviction is LRU-capacity
//! **and** TTL, both enforced on read.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use lru::LruCache;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// `search:{type}:{cacheKey}:p{page}:s{size}` (spec §4.14) — built by
/// callers, this module only stores and expires whatever key it's given.
pub struct ResultCache<V: Clone> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    ttl: Duration,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap();
        ResultCache {
            entries: Mutex::new(LruCache::new(cap)),
            ttl,
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.pop(key);
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Only non-empty responses are cached (spec §4.14); callers decide
    /// what counts as empty and simply don't call `put` otherwise.
    pub fn put(&self, key: String, value: V) {
        self.entries.lock().put(key, Entry { value, expires_at: Instant::now() + self.ttl });
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.entries.lock().len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hit_count: usize,
    pub miss_count: usize,
    pub size: usize,
}

/// `search:{type}:{cacheKey}:p{page}:s{size}` key builder.
pub fn cache_key(query_type: &str, cache_key: &str, page: usize, size: usize) -> String {
    format!("search:{query_type}:{cache_key}:p{page}:s{size}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn caches_and_expires() {
        let cache = ResultCache::new(10, Duration::from_millis(20));
        cache.put("k".to_string(), 42);
        assert_eq!(cache.get("k"), Some(42));
        sleep(Duration::from_millis(30));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn missing_key_is_not_an_error() {
        let cache: ResultCache<u32> = ResultCache::new(10, Duration::from_secs(1));
        assert_eq!(cache.get("nope"), None);
        assert_eq!(cache.stats().miss_count, 1);
    }

    #[test]
    fn key_format_matches_spec() {
        assert_eq!(cache_key("bm25", "abc123", 1, 20), "search:bm25:abc123:p1:s20");
    }
}
