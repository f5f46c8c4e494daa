//! Run-scoped memoization of rendered page bodies.
//!
//! A [`ComputeCache`] is a bounded LRU map shared between render workers.
//! Values are computed outside the lock, so two workers racing on the same
//! key may both compute it; the first stored value wins.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use super::format::FormatOutput;
use super::site::PageId;

/// Rendered page content, before layouts, keyed by page.
pub type RenderCache = ComputeCache<PageId, Arc<FormatOutput>>;

pub struct ComputeCache<K, V> {
    entries: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq, V: Clone> ComputeCache<K, V> {
    /// A cache holding at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// Errors are returned as-is and nothing is stored.
    pub fn get_or_compute<E>(&self, key: K, compute: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = compute()?;
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            return Ok(existing.clone());
        }
        entries.put(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.entries.lock().pop(key)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for ComputeCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("ComputeCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_computes_once() {
        let cache: ComputeCache<u32, String> = ComputeCache::new(4);
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, ()>("value".to_string())
        };

        assert_eq!(cache.get_or_compute(1, compute).unwrap(), "value");
        assert_eq!(cache.get_or_compute(1, compute).unwrap(), "value");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: ComputeCache<u32, String> = ComputeCache::new(4);
        assert!(cache.get_or_compute(1, || Err("boom")).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_compute(1, || Ok::<_, &str>("ok".to_string())).unwrap(), "ok");
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache: ComputeCache<u32, u32> = ComputeCache::new(2);
        cache.get_or_compute(1, || Ok::<_, ()>(10)).unwrap();
        cache.get_or_compute(2, || Ok::<_, ()>(20)).unwrap();
        // touch 1 so 2 is evicted next
        assert_eq!(cache.get(&1), Some(10));
        cache.get_or_compute(3, || Ok::<_, ()>(30)).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some(10));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache: RenderCache = ComputeCache::new(8);
        let body = Arc::new(FormatOutput {
            html: "<p>hi</p>".to_string(),
            toc: Vec::new(),
        });
        cache
            .get_or_compute(PageId(0), || Ok::<_, ()>(body.clone()))
            .unwrap();
        cache
            .get_or_compute(PageId(1), || Ok::<_, ()>(body.clone()))
            .unwrap();

        let removed = cache.invalidate(&PageId(0)).unwrap();
        assert_eq!(removed.html, "<p>hi</p>");
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let cache: ComputeCache<u32, u32> = ComputeCache::new(0);
        cache.get_or_compute(1, || Ok::<_, ()>(1)).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
