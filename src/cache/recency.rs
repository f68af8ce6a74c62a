use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

struct Slots<K: Hash + Eq, V> {
    map: LruCache<K, V>,
    /// Bumped by every removal; read-through fills compare against it
    generation: u64,
}

/// Bounded map evicting the least-recently-used entry on overflow
///
/// Thin synchronous wrapper around `lru::LruCache`. The lock is never held
/// across an await point, so a std mutex is enough.
pub struct RecencyCache<K: Hash + Eq, V: Clone> {
    slots: Mutex<Slots<K, V>>,
}

impl<K: Hash + Eq, V: Clone> RecencyCache<K, V> {
    /// A capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(Slots {
                map: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slots<K, V>> {
        // A panic while holding the lock cannot leave the map half-updated
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hit promotes the entry to most-recently-used
    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().map.get(key).cloned()
    }

    /// Read without touching recency
    #[cfg(test)]
    pub fn peek(&self, key: &K) -> Option<V> {
        self.lock().map.peek(key).cloned()
    }

    /// Insert or replace; a new key at capacity evicts exactly one entry
    pub fn set(&self, key: K, value: V) {
        self.lock().map.put(key, value);
    }

    /// Current removal generation, taken before loading a value to fill
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Insert only if nothing was removed since `generation` was read
    ///
    /// Returns whether the value was stored.
    pub fn fill(&self, key: K, value: V, generation: u64) -> bool {
        let mut slots = self.lock();
        if slots.generation != generation {
            return false;
        }
        slots.map.put(key, value);
        true
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut slots = self.lock();
        slots.generation += 1;
        slots.map.pop(key)
    }

    pub fn clear(&self) {
        let mut slots = self.lock();
        slots.generation += 1;
        slots.map.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().map.cap().get()
    }
}
