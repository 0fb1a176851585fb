use std::{hash::Hash, sync::Arc};

use dashmap::DashMap;

/// A concurrent store of shared values, keyed by id.
///
/// Clones share the same underlying map.
pub struct ArcedStore<K, V> {
    inner: Arc<DashMap<K, Arc<V>>>,
}

impl<K, V> ArcedStore<K, V>
where
    K: Eq + Hash,
{
    pub fn insert(&self, id: K, value: Arc<V>) {
        self.inner.insert(id, value);
    }

    pub fn get(&self, id: &K) -> Option<Arc<V>> {
        self.inner.get(id).map(|v| v.value().clone())
    }

    pub fn remove(&self, id: &K) -> Option<Arc<V>> {
        self.inner.remove(id).map(|(_, v)| v)
    }

    /// All values currently in the store
    pub fn all(&self) -> Vec<Arc<V>> {
        self.inner.iter().map(|v| v.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K, V> Clone for ArcedStore<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> Default for ArcedStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            inner: Default::default(),
        }
    }
}
