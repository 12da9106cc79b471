//! Desired-subscription registry.
//!
//! Maps a primary key to the set of kinds subscribed under it. Keys with no
//! kinds left are removed, so `keys()` lists only keys that still hold
//! something. Ordered maps keep replay order deterministic.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRegistry<K: Ord, D: Ord> {
    topics: BTreeMap<K, BTreeSet<D>>,
}

impl<K: Ord, D: Ord> Default for SubscriptionRegistry<K, D> {
    fn default() -> Self {
        Self { topics: BTreeMap::new() }
    }
}

impl<K: Ord + Clone, D: Ord + Copy> SubscriptionRegistry<K, D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the topic was not present before.
    pub fn insert(&mut self, key: K, kind: D) -> bool {
        self.topics.entry(key).or_default().insert(kind)
    }

    /// Returns `true` if the topic was present.
    pub fn remove(&mut self, key: &K, kind: D) -> bool {
        let Some(kinds) = self.topics.get_mut(key) else {
            return false;
        };
        let removed = kinds.remove(&kind);
        if kinds.is_empty() {
            self.topics.remove(key);
        }
        removed
    }

    pub fn contains(&self, key: &K, kind: D) -> bool {
        self.topics.get(key).is_some_and(|kinds| kinds.contains(&kind))
    }

    pub fn keys(&self) -> Vec<K> {
        self.topics.keys().cloned().collect()
    }

    pub fn kinds(&self, key: &K) -> Vec<D> {
        self.topics.get(key).map(|k| k.iter().copied().collect()).unwrap_or_default()
    }

    /// Every `(key, kind)` pair in key order.
    pub fn topics(&self) -> impl Iterator<Item = (&K, D)> + '_ {
        self.topics.iter().flat_map(|(key, kinds)| kinds.iter().map(move |kind| (key, *kind)))
    }

    /// Number of topics across all keys.
    pub fn len(&self) -> usize {
        self.topics.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn clear(&mut self) {
        self.topics.clear();
    }

    /// Owned copy of the whole map.
    pub fn snapshot(&self) -> BTreeMap<K, BTreeSet<D>> {
        self.topics.clone()
    }
}
