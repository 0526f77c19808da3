//! Indexed lock state: per-boundary, ordered, key-indexed storage of
//! lock-info (spec §4.1).
//!
//! Parameterized by a key-extractor `F: LockInfo -> K`. Each strategy
//! instantiates its own store with the extractor that matches the key its
//! `can_lock` rules group entries by (e.g. action-id for single-execution,
//! concurrency-group for concurrency-limited). Every boundary keeps both an
//! insertion-ordered list (for `current_locks`) and a `HashMap<K, Vec<Info>>`
//! secondary index (for O(1)-average key-scoped queries), the same
//! order-plus-bucket shape `GroupCoordinationStrategy` keeps by hand for its
//! own per-group bookkeeping.

use crate::id::{BoundaryId, UniqueId};
use crate::info::LockInfo;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

#[cfg(not(loom))]
use std::sync::Mutex;
#[cfg(loom)]
use loom::sync::Mutex;

/// One boundary's live entries: insertion order plus a key index over the
/// same entries. `pub(crate)` so strategies needing an atomic decide-then-
/// commit (see [`IndexedLockState::transact`]) can read and mutate both
/// views within the single critical section `transact` opens for them.
pub(crate) struct BoundaryIndex<Info, K> {
    pub(crate) order: Vec<Info>,
    pub(crate) by_key: HashMap<K, Vec<Info>>,
}

impl<Info, K> Default for BoundaryIndex<Info, K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            by_key: HashMap::new(),
        }
    }
}

impl<Info, K> BoundaryIndex<Info, K>
where
    Info: LockInfo,
    K: Hash + Eq + Clone,
{
    pub(crate) fn insert(&mut self, key: K, info: Info) {
        self.order.push(info.clone());
        self.by_key.entry(key).or_default().push(info);
    }

    pub(crate) fn remove(&mut self, key: &K, unique_id: UniqueId) {
        self.order.retain(|e| e.unique_id() != unique_id);
        if let Some(bucket) = self.by_key.get_mut(key) {
            bucket.retain(|e| e.unique_id() != unique_id);
            if bucket.is_empty() {
                self.by_key.remove(key);
            }
        }
    }

    fn remove_matching(&mut self, key: &K) {
        if let Some(bucket) = self.by_key.remove(key) {
            let removed: HashSet<UniqueId> = bucket.iter().map(LockInfo::unique_id).collect();
            self.order.retain(|e| !removed.contains(&e.unique_id()));
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

struct Inner<Info, K> {
    boundaries: HashMap<BoundaryId, BoundaryIndex<Info, K>>,
}

impl<Info, K> Default for Inner<Info, K> {
    fn default() -> Self {
        Self {
            boundaries: HashMap::new(),
        }
    }
}

/// Per-boundary, ordered, key-indexed storage of lock-info.
///
/// Every public operation is a single critical section over an internal
/// mutex (spec §4.1, §5). Snapshots are returned by value: no iterator or
/// reference into the guarded state escapes a method call.
pub struct IndexedLockState<Info, K, F> {
    inner: Mutex<Inner<Info, K>>,
    key_of: F,
}

impl<Info, K, F> IndexedLockState<Info, K, F>
where
    Info: LockInfo,
    K: Hash + Eq + Clone,
    F: Fn(&Info) -> K,
{
    pub fn new(key_of: F) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            key_of,
        }
    }

    /// Appends `info` to `boundary`'s ordered sequence and key index.
    /// Creates the boundary if it didn't exist.
    pub fn add(&self, boundary: &BoundaryId, info: Info) {
        let mut inner = self.inner.lock().expect("lock state mutex poisoned");
        let key = (self.key_of)(&info);
        inner.boundaries.entry(boundary.clone()).or_default().insert(key, info);
    }

    /// Removes the entry whose unique-id matches `info.unique_id()`. No-op
    /// if absent. Drops the boundary entirely once its last entry is gone.
    pub fn remove(&self, boundary: &BoundaryId, info: &Info) {
        let mut inner = self.inner.lock().expect("lock state mutex poisoned");
        let key = (self.key_of)(info);
        if let Some(index) = inner.boundaries.get_mut(boundary) {
            index.remove(&key, info.unique_id());
            if index.is_empty() {
                inner.boundaries.remove(boundary);
            }
        }
    }

    /// Ordered snapshot of every entry in `boundary`.
    #[must_use]
    pub fn current_locks(&self, boundary: &BoundaryId) -> Vec<Info> {
        let inner = self.inner.lock().expect("lock state mutex poisoned");
        inner.boundaries.get(boundary).map(|index| index.order.clone()).unwrap_or_default()
    }

    /// Entries in `boundary` whose extracted key equals `key`: an O(1)
    /// average hash lookup into the per-boundary key index, not a scan over
    /// every entry.
    #[must_use]
    pub fn current_locks_matching(&self, boundary: &BoundaryId, key: &K) -> Vec<Info> {
        let inner = self.inner.lock().expect("lock state mutex poisoned");
        inner
            .boundaries
            .get(boundary)
            .and_then(|index| index.by_key.get(key))
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_active_locks(&self, boundary: &BoundaryId, key: &K) -> bool {
        self.active_lock_count(boundary, key) > 0
    }

    #[must_use]
    pub fn active_lock_count(&self, boundary: &BoundaryId, key: &K) -> usize {
        let inner = self.inner.lock().expect("lock state mutex poisoned");
        inner
            .boundaries
            .get(boundary)
            .and_then(|index| index.by_key.get(key))
            .map_or(0, Vec::len)
    }

    /// Set of keys currently present in `boundary`.
    #[must_use]
    pub fn active_keys(&self, boundary: &BoundaryId) -> Vec<K> {
        let inner = self.inner.lock().expect("lock state mutex poisoned");
        inner
            .boundaries
            .get(boundary)
            .map(|index| index.by_key.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Boundaries with at least one live entry.
    #[must_use]
    pub fn active_boundary_ids(&self) -> Vec<BoundaryId> {
        let inner = self.inner.lock().expect("lock state mutex poisoned");
        inner.boundaries.keys().cloned().collect()
    }

    #[must_use]
    pub fn total_active_lock_count(&self) -> usize {
        let inner = self.inner.lock().expect("lock state mutex poisoned");
        inner.boundaries.values().map(|index| index.order.len()).sum()
    }

    /// Snapshot of every boundary's ordered entries.
    #[must_use]
    pub fn all_active_locks(&self) -> HashMap<BoundaryId, Vec<Info>> {
        let inner = self.inner.lock().expect("lock state mutex poisoned");
        inner.boundaries.iter().map(|(b, index)| (b.clone(), index.order.clone())).collect()
    }

    /// Drops every entry in `boundary` whose extracted key equals `key`.
    pub fn remove_all_matching(&self, boundary: &BoundaryId, key: &K) {
        let mut inner = self.inner.lock().expect("lock state mutex poisoned");
        if let Some(index) = inner.boundaries.get_mut(boundary) {
            index.remove_matching(key);
            if index.is_empty() {
                inner.boundaries.remove(boundary);
            }
        }
    }

    /// Drops every entry in `boundary`.
    pub fn remove_all_boundary(&self, boundary: &BoundaryId) {
        let mut inner = self.inner.lock().expect("lock state mutex poisoned");
        inner.boundaries.remove(boundary);
    }

    /// Drops every entry in every boundary.
    pub fn remove_all(&self) {
        let mut inner = self.inner.lock().expect("lock state mutex poisoned");
        inner.boundaries.clear();
    }

    /// Runs `op` against `boundary`'s index under a single acquisition of
    /// the internal mutex, so a strategy can decide against the current
    /// entries and, if it decides to commit, write the new entry back
    /// without another thread's `transact`/`add`/`remove` call landing in
    /// between the decision and the write (spec §4.10, §5).
    ///
    /// This is what `Strategy::acquire` implementations use in place of
    /// composing `current_locks`/`current_locks_matching` (read) with
    /// `add`/`remove` (write) as separate calls, each of which is its own
    /// critical section and so cannot give that guarantee.
    pub(crate) fn transact<V>(
        &self,
        boundary: &BoundaryId,
        op: impl FnOnce(&mut BoundaryIndex<Info, K>) -> V,
    ) -> V {
        let mut inner = self.inner.lock().expect("lock state mutex poisoned");
        let index = inner.boundaries.entry(boundary.clone()).or_default();
        let result = op(index);
        if index.is_empty() {
            inner.boundaries.remove(boundary);
        }
        result
    }
}
