//! BoundedCache - keyed, insertion-ordered store with FIFO eviction
//!
//! Key properties:
//! - `add` on an existing key replaces the value but keeps its original slot
//! - eviction removes the oldest inserted key first (FIFO, not LRU)
//! - `get_all` returns values most-recent-insertion-first
//!
//! The cache is not internally synchronized. Exclusive access comes from
//! ownership: only the coordinator task holds a `&mut` to it, and readers
//! receive cloned snapshots.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// A value that knows its own cache key
pub trait CacheEntry: Clone {
    type Key: Eq + Hash + Clone;

    fn cache_key(&self) -> Self::Key;
}

/// Fixed-capacity keyed store evicting the oldest insertion first
#[derive(Debug, Clone)]
pub struct BoundedCache<E: CacheEntry> {
    entries: HashMap<E::Key, E>,
    order: VecDeque<E::Key>,
    max_size: usize,
}

impl<E: CacheEntry> BoundedCache<E> {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(max_size.min(1024)),
            order: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Insert or replace an entry
    ///
    /// Replacing keeps the key's original position in the order.
    pub fn add(&mut self, entry: E) {
        let key = entry.cache_key();
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = entry;
            return;
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, entry);

        while self.order.len() > self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        debug_assert_eq!(self.order.len(), self.entries.len());
    }

    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &E::Key) -> bool {
        self.entries.contains_key(key)
    }

    /// All values, most recent insertion first
    pub fn get_all(&self) -> Vec<E> {
        self.order
            .iter()
            .rev()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }

    /// All values, oldest insertion first
    pub fn oldest_first(&self) -> Vec<E> {
        self.order
            .iter()
            .filter_map(|key| self.entries.get(key).cloned())
            .collect()
    }

    /// Remove an entry (no-op when absent)
    pub fn remove(&mut self, key: &E::Key) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
        debug_assert_eq!(self.order.len(), self.entries.len());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        path: &'static str,
        rev: u32,
    }

    impl CacheEntry for Item {
        type Key = &'static str;

        fn cache_key(&self) -> Self::Key {
            self.path
        }
    }

    fn item(path: &'static str, rev: u32) -> Item {
        Item { path, rev }
    }

    fn paths(cache: &BoundedCache<Item>) -> Vec<&'static str> {
        cache.get_all().into_iter().map(|i| i.path).collect()
    }

    #[test]
    fn test_get_all_is_most_recent_first() {
        let mut cache = BoundedCache::new(10);
        cache.add(item("a", 1));
        cache.add(item("b", 1));
        cache.add(item("c", 1));
        assert_eq!(paths(&cache), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut cache = BoundedCache::new(2);
        cache.add(item("a", 1));
        cache.add(item("b", 1));
        cache.add(item("c", 1));
        assert_eq!(paths(&cache), vec!["c", "b"]);
        assert!(cache.get(&"a").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_readd_keeps_original_position() {
        let mut cache = BoundedCache::new(3);
        cache.add(item("a", 1));
        cache.add(item("b", 1));
        cache.add(item("a", 2));

        assert_eq!(paths(&cache), vec!["b", "a"]);
        assert_eq!(cache.get(&"a").unwrap().rev, 2);
    }

    #[test]
    fn test_readd_does_not_refresh_eviction_order() {
        // FIFO: touching "a" does not protect it
        let mut cache = BoundedCache::new(2);
        cache.add(item("a", 1));
        cache.add(item("b", 1));
        cache.add(item("a", 2));
        cache.add(item("c", 1));
        assert_eq!(paths(&cache), vec!["c", "b"]);
    }

    #[test]
    fn test_remove_and_missing_keys() {
        let mut cache = BoundedCache::new(4);
        cache.add(item("a", 1));
        cache.add(item("b", 1));

        cache.remove(&"a");
        cache.remove(&"zzz");
        assert_eq!(paths(&cache), vec!["b"]);
        assert!(cache.get(&"zzz").is_none());
    }

    #[test]
    fn test_clear() {
        let mut cache = BoundedCache::new(4);
        cache.add(item("a", 1));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get_all().is_empty());
    }

    #[test]
    fn test_oldest_first() {
        let mut cache = BoundedCache::new(4);
        cache.add(item("a", 1));
        cache.add(item("b", 1));
        let order: Vec<_> = cache.oldest_first().into_iter().map(|i| i.path).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let mut cache = BoundedCache::new(0);
        cache.add(item("a", 1));
        assert!(cache.is_empty());
    }
}
