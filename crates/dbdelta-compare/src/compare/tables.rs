//! Table set difference

use std::collections::BTreeSet;

/// Table names split by the side they exist on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSet {
    /// Only in the new snapshot
    pub added: BTreeSet<String>,
    /// Only in the old snapshot
    pub removed: BTreeSet<String>,
    /// In both snapshots
    pub common: BTreeSet<String>,
}

impl TableSet {
    pub fn diff<I, J>(old: I, new: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        let old: BTreeSet<String> = old.into_iter().collect();
        let new: BTreeSet<String> = new.into_iter().collect();

        Self {
            added: new.difference(&old).cloned().collect(),
            removed: old.difference(&new).cloned().collect(),
            common: old.intersection(&new).cloned().collect(),
        }
    }

    /// Every table name, sorted
    pub fn all(&self) -> BTreeSet<&str> {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.common)
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.common.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
