//! Keyed memoization of deferred values.

use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use super::Deferred;

/// A named table of deferred results.
///
/// The first request for a key stores the deferred value built by `compute`;
/// later requests, including concurrent ones still waiting on the first,
/// receive a clone of that same value. Since a [`Deferred`] runs at most once,
/// each key is computed at most once.
pub struct Memo<K, V> {
    name: &'static str,
    table: Mutex<FxHashMap<K, Deferred<V>>>,
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + std::fmt::Debug,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            table: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up `key`, building the value with `compute` on a miss.
    ///
    /// `compute` only assembles the deferred value; it must not block or
    /// re-enter this memo.
    pub fn exec(&self, key: K, compute: impl FnOnce() -> Deferred<V>) -> Deferred<V> {
        let mut table = self.lock();
        if let Some(hit) = table.get(&key) {
            tracing::trace!(memo = self.name, ?key, "memo hit");
            return hit.clone();
        }
        tracing::trace!(memo = self.name, ?key, "memo miss");
        let value = compute();
        table.insert(key, value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Entries are inserted whole, so a poisoned table is still consistent.
    fn lock(&self) -> MutexGuard<'_, FxHashMap<K, Deferred<V>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
