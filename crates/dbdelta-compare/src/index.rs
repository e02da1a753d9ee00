//! Multi-key row index used for identity matching
//!
//! Every row is stored once under a group id and registered under all of the
//! keys its indexer produces. A lookup can hit any of them; a successful
//! [`HierarchicalRowIndex::claim`] removes the group and every registration
//! it holds, so a stored row is matched at most once.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

type GroupId = u64;

struct Group<K, R> {
    row: R,
    keys: Vec<K>,
}

/// Index of rows addressable by any of several candidate keys
pub struct HierarchicalRowIndex<K, R, F> {
    indexer: F,
    next_group: GroupId,
    // Groups registered under each key, earliest first. Claimed groups are
    // dropped from the front eagerly and from elsewhere lazily.
    keys: HashMap<K, VecDeque<GroupId>>,
    groups: HashMap<GroupId, Group<K, R>>,
    // Every group ever added, in insertion order. Claimed ids are skipped
    // by `remaining`.
    order: Vec<GroupId>,
}

impl<K, R, F> HierarchicalRowIndex<K, R, F>
where
    K: Eq + Hash + Clone,
    F: Fn(&R) -> Vec<K>,
{
    /// Create an empty index. `indexer` returns a row's keys, highest
    /// priority first.
    pub fn new(indexer: F) -> Self {
        Self {
            indexer,
            next_group: 0,
            keys: HashMap::new(),
            groups: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Store `row` under all of its keys.
    ///
    /// When several rows share a key, the first one added owns it. Later
    /// rows wait behind the owner and answer for the key only once every
    /// earlier row holding it has been claimed.
    pub fn add(&mut self, row: R) {
        let group = self.next_group;
        self.next_group += 1;

        let keys = (self.indexer)(&row);
        for key in &keys {
            let owners = self.keys.entry(key.clone()).or_default();
            if owners.back() != Some(&group) {
                owners.push_back(group);
            }
        }
        self.groups.insert(group, Group { row, keys });
        self.order.push(group);
    }

    /// Find and remove the stored row matching `probe`.
    ///
    /// The probe's keys are tried in priority order and the first hit wins.
    /// Returns `None` when no key matches.
    pub fn claim(&mut self, probe: &R) -> Option<R> {
        let probe_keys = (self.indexer)(probe);
        let group = probe_keys.iter().find_map(|key| self.owner(key))?;

        let claimed = self.groups.remove(&group)?;
        for key in &claimed.keys {
            self.prune(key);
        }
        Some(claimed.row)
    }

    /// Live group owning `key`
    fn owner(&mut self, key: &K) -> Option<GroupId> {
        self.prune(key);
        self.keys.get(key).and_then(|owners| owners.front().copied())
    }

    /// Drop claimed groups from the front of `key`'s owners
    fn prune(&mut self, key: &K) {
        let Some(owners) = self.keys.get_mut(key) else {
            return;
        };
        while let Some(front) = owners.front() {
            if self.groups.contains_key(front) {
                break;
            }
            owners.pop_front();
        }
        if owners.is_empty() {
            self.keys.remove(key);
        }
    }

    /// Rows never claimed, in insertion order
    pub fn remaining(self) -> impl Iterator<Item = R> {
        let mut groups = self.groups;
        self.order
            .into_iter()
            .filter_map(move |id| groups.remove(&id))
            .map(|group| group.row)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
