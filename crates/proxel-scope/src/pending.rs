//! Parked markers awaiting a controller.
//!
//! Markers are grouped by the host id they wait for. Markers without an
//! explicit id wait in the [`UNSCOPED`] bucket and are matched by subtree
//! containment instead of by id.

use std::hash::Hash;

use ahash::AHashMap;
use indexmap::IndexSet;

/// Bucket key for markers resolved against their nearest enclosing scope.
pub const UNSCOPED: &str = "";

/// Host id → parked markers, in parking order.
#[derive(Debug, Clone)]
pub struct PendingBindings<N> {
    buckets: AHashMap<String, IndexSet<N>>,
}

impl<N> Default for PendingBindings<N> {
    fn default() -> Self {
        Self {
            buckets: AHashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> PendingBindings<N> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `marker` under `key`, moving it out of any other bucket.
    /// Returns `false` if it was already parked under `key`.
    pub fn park(&mut self, key: &str, marker: N) -> bool {
        if self.bucket(key).is_some_and(|b| b.contains(&marker)) {
            return false;
        }
        self.forget(marker);
        self.buckets
            .entry(key.to_owned())
            .or_default()
            .insert(marker)
    }

    /// Remove and return the whole bucket for `key`.
    pub fn take(&mut self, key: &str) -> Vec<N> {
        self.buckets
            .remove(key)
            .map(|bucket| bucket.into_iter().collect())
            .unwrap_or_default()
    }

    /// Remove and return the markers of bucket `key` accepted by `pred`,
    /// preserving parking order.
    pub fn take_matching(&mut self, key: &str, mut pred: impl FnMut(N) -> bool) -> Vec<N> {
        let Some(bucket) = self.buckets.get_mut(key) else {
            return Vec::new();
        };
        let taken: Vec<N> = bucket.iter().copied().filter(|m| pred(*m)).collect();
        bucket.retain(|m| !taken.contains(m));
        if bucket.is_empty() {
            self.buckets.remove(key);
        }
        taken
    }

    /// Drop `marker` from whichever bucket holds it.
    pub fn forget(&mut self, marker: N) -> bool {
        let Some(key) = self
            .buckets
            .iter()
            .find(|(_, bucket)| bucket.contains(&marker))
            .map(|(key, _)| key.clone())
        else {
            return false;
        };
        if let Some(bucket) = self.buckets.get_mut(&key) {
            bucket.shift_remove(&marker);
            if bucket.is_empty() {
                self.buckets.remove(&key);
            }
        }
        true
    }

    #[must_use]
    pub fn bucket(&self, key: &str) -> Option<&IndexSet<N>> {
        self.buckets.get(key)
    }

    /// Key of the bucket holding `marker`.
    #[must_use]
    pub fn key_of(&self, marker: N) -> Option<&str> {
        self.buckets
            .iter()
            .find(|(_, bucket)| bucket.contains(&marker))
            .map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn is_parked(&self, marker: N) -> bool {
        self.key_of(marker).is_some()
    }

    /// Total number of parked markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(IndexSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}
