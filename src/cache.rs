//! Keyed single-flight cache for the heavyweight one-time loads

use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Caches one computation per key.
///
/// Concurrent callers of [`LoadCache::get_or_load`] for the same key share a
/// single in-flight computation: the factory runs once and every caller gets
/// a clone of its value. A failed computation is not cached, the next caller
/// runs the factory again.
pub struct LoadCache<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> LoadCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, computing it with `factory` if needed
    pub async fn get_or_load<F, Fut>(&self, key: K, factory: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let cell = self.cell(&key);

        if let Some(value) = cell.get() {
            log::debug!("Cache hit for {:?}", key);
            return Ok(value.clone());
        }

        let value = cell
            .get_or_try_init(|| {
                log::debug!("Cache miss for {:?}, loading", key);
                factory()
            })
            .await?;

        Ok(value.clone())
    }

    /// Cached value for `key`, if a load already succeeded
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Forget the value for `key` so the next call loads again
    pub fn invalidate(&self, key: &K) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }
}

impl<K, V> Default for LoadCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
