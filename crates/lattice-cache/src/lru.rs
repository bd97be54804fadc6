//! Bounded LRU cache.
//!
//! A hash map gives O(1) lookup; an intrusive doubly linked list threaded
//! through the entries gives O(1) recency updates and eviction. The list
//! head is the most recently used entry, the tail the next eviction
//! victim.

use std::collections::HashMap;
use std::hash::Hash;
use std::ptr::NonNull;

use crate::stats::CacheStats;

struct Entry<K, V> {
    key: K,
    value: V,
    prev: Option<NonNull<Entry<K, V>>>,
    next: Option<NonNull<Entry<K, V>>>,
}

/// A fixed-capacity map evicting the least recently used entry on
/// overflow.
///
/// Lookups through [`get`](Self::get) refresh recency; [`peek`](Self::peek)
/// does not. Every entry is heap-allocated once and reached through raw
/// pointers owned by this struct, so the cache is `Send`/`Sync` exactly
/// when its keys and values are.
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, NonNull<Entry<K, V>>>,
    head: Option<NonNull<Entry<K, V>>>,
    tail: Option<NonNull<Entry<K, V>>>,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            head: None,
            tail: None,
            stats: CacheStats::new(),
        }
    }

    /// Looks up `key`, marking the entry most recently used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.stats.record_access();
        match self.map.get(key).copied() {
            Some(ptr) => {
                self.stats.record_hit();
                self.detach(ptr);
                self.push_front(ptr);
                // The entry outlives this borrow: it is freed only by
                // methods taking &mut self.
                Some(unsafe { &(*ptr.as_ptr()).value })
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Looks up `key` without touching recency or statistics.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.map
            .get(key)
            .map(|ptr| unsafe { &(*ptr.as_ptr()).value })
    }

    /// Stores `value` under `key`, returning the replaced value when the
    /// key was already present. Inserting into a full cache evicts the
    /// least recently used entry first.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.stats.record_insert();
        if let Some(ptr) = self.map.get(&key).copied() {
            let old = unsafe { std::mem::replace(&mut (*ptr.as_ptr()).value, value) };
            self.detach(ptr);
            self.push_front(ptr);
            return Some(old);
        }
        if self.map.len() >= self.capacity {
            self.evict_lru();
        }
        let entry = Box::new(Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        // Box::into_raw never returns null.
        let ptr = unsafe { NonNull::new_unchecked(Box::into_raw(entry)) };
        self.map.insert(key, ptr);
        self.push_front(ptr);
        None
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let ptr = self.map.remove(key)?;
        self.stats.record_removal();
        self.detach(ptr);
        let entry = unsafe { Box::from_raw(ptr.as_ptr()) };
        Some(entry.value)
    }

    /// Whether `key` is currently cached.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Drops every entry, keeping capacity and statistics.
    pub fn clear(&mut self) {
        self.map.clear();
        self.drain_list();
    }

    fn evict_lru(&mut self) {
        let Some(tail) = self.tail else { return };
        let key = unsafe { (*tail.as_ptr()).key.clone() };
        if self.map.remove(&key).is_some() {
            self.detach(tail);
            unsafe { drop(Box::from_raw(tail.as_ptr())) };
            self.stats.record_eviction();
        }
    }
}

impl<K, V> LruCache<K, V> {
    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lookup and eviction counters.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn detach(&mut self, ptr: NonNull<Entry<K, V>>) {
        unsafe {
            let entry = &mut *ptr.as_ptr();
            match entry.prev {
                Some(mut prev) => prev.as_mut().next = entry.next,
                None => self.head = entry.next,
            }
            match entry.next {
                Some(mut next) => next.as_mut().prev = entry.prev,
                None => self.tail = entry.prev,
            }
            entry.prev = None;
            entry.next = None;
        }
    }

    fn push_front(&mut self, mut ptr: NonNull<Entry<K, V>>) {
        unsafe {
            let entry = ptr.as_mut();
            entry.prev = None;
            entry.next = self.head;
        }
        if let Some(mut head) = self.head {
            unsafe { head.as_mut().prev = Some(ptr) };
        }
        self.head = Some(ptr);
        if self.tail.is_none() {
            self.tail = Some(ptr);
        }
    }

    fn drain_list(&mut self) {
        let mut cursor = self.head.take();
        self.tail = None;
        while let Some(ptr) = cursor {
            unsafe {
                cursor = (*ptr.as_ptr()).next;
                drop(Box::from_raw(ptr.as_ptr()));
            }
        }
    }
}

impl<K, V> Drop for LruCache<K, V> {
    fn drop(&mut self) {
        self.drain_list();
    }
}

// The raw pointers are owned by the cache and only dereferenced behind
// &self/&mut self, so thread safety reduces to the payload types.
unsafe impl<K: Send, V: Send> Send for LruCache<K, V> {}
unsafe impl<K: Send + Sync, V: Send + Sync> Sync for LruCache<K, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let mut cache = LruCache::new(4);
        assert!(cache.is_empty());
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(&1));
        assert_eq!(cache.get(&"missing"), None);
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Touch "a" so "b" becomes the eviction victim.
        assert_eq!(cache.get(&"a"), Some(&1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn reinsert_replaces_and_refreshes() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.insert("a", 10), Some(1));
        cache.insert("c", 3);

        // "b" was least recently used once "a" was reinserted.
        assert_eq!(cache.peek(&"a"), Some(&10));
        assert!(!cache.contains(&"b"));
        assert!(cache.contains(&"c"));
    }

    #[test]
    fn remove_returns_the_value() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        assert_eq!(cache.remove(&"a"), Some(1));
        assert_eq!(cache.remove(&"a"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_empties_the_cache() {
        let mut cache = LruCache::new(4);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
        cache.insert("c", 3);
        assert_eq!(cache.get(&"c"), Some(&3));
    }

    #[test]
    fn statistics_track_operations() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get(&"a");
        cache.get(&"nope");
        cache.insert("c", 3); // evicts "b"
        cache.remove(&"a");

        let stats = cache.stats();
        assert_eq!(stats.accesses(), 2);
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.inserts(), 3);
        assert_eq!(stats.evictions(), 1);
        assert_eq!(stats.removals(), 1);
    }

    #[test]
    fn capacity_is_at_least_one() {
        let mut cache = LruCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"b"));
    }

    #[test]
    fn peek_does_not_promote() {
        let mut cache = LruCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.peek(&"a"), Some(&1));
        cache.insert("c", 3);
        // "a" was still least recently used despite the peek.
        assert!(!cache.contains(&"a"));
    }
}
