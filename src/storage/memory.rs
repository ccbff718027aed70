use dashmap::{mapref::entry::Entry, DashMap};
use std::{hash::Hash, sync::Arc};

#[derive(Clone, Debug)]
pub struct MemoryCache<K: Eq + Hash, V: Clone> {
    cache: Arc<DashMap<K, V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> MemoryCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.cache.get(key).map(|value| value.value().clone())
    }

    /// Returns the stored value, inserting `init()` first if the key is absent.
    /// The shard lock is released before returning.
    pub fn get_or_insert_with(&self, key: K, init: impl FnOnce() -> V) -> V {
        self.cache.entry(key).or_insert_with(init).value().clone()
    }

    /// Atomically replaces the value under `key` with `f(current)` and returns the new value.
    pub fn update<F>(&self, key: K, f: F) -> V
    where
        F: FnOnce(Option<&V>) -> V,
    {
        match self.cache.entry(key) {
            Entry::Occupied(mut occupied) => {
                let next = f(Some(occupied.get()));
                occupied.insert(next.clone());
                next
            }
            Entry::Vacant(vacant) => {
                let next = f(None);
                vacant.insert(next.clone());
                next
            }
        }
    }

    pub fn retain(&self, f: impl FnMut(&K, &mut V) -> bool) {
        self.cache.retain(f);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }
}
