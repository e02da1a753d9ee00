//! Column level comparison

use super::diff::ColumnChange;
use dbdelta_core::ColumnInfo;
use std::collections::HashMap;

/// Compares the column lists of two versions of a table
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaComparator {
    case_insensitive_types: bool,
}

impl SchemaComparator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare type labels ignoring ASCII case
    pub fn with_case_insensitive_types(mut self, enabled: bool) -> Self {
        self.case_insensitive_types = enabled;
        self
    }

    /// Diff two column lists by name.
    ///
    /// Every column name found on either side is either unchanged or
    /// appears in exactly one change. The result lists additions in new
    /// declared order, then removals and modifications in old declared
    /// order.
    pub fn compare_columns(&self, old: &[ColumnInfo], new: &[ColumnInfo]) -> Vec<ColumnChange> {
        let old_by_name: HashMap<&str, &ColumnInfo> =
            old.iter().map(|c| (c.name.as_str(), c)).collect();
        let new_by_name: HashMap<&str, &ColumnInfo> =
            new.iter().map(|c| (c.name.as_str(), c)).collect();

        let mut changes = Vec::new();

        for column in new {
            if !old_by_name.contains_key(column.name.as_str()) {
                changes.push(ColumnChange::Added {
                    new: column.clone(),
                });
            }
        }

        for column in old {
            if !new_by_name.contains_key(column.name.as_str()) {
                changes.push(ColumnChange::Removed {
                    old: column.clone(),
                });
            }
        }

        for column in old {
            if let Some(other) = new_by_name.get(column.name.as_str())
                && !column.same_definition(other, self.case_insensitive_types)
            {
                changes.push(ColumnChange::Modified {
                    old: column.clone(),
                    new: (*other).clone(),
                });
            }
        }

        changes
    }
}

/// Names of the columns present on both sides, in old declared order
pub fn common_columns(old: &[ColumnInfo], new: &[ColumnInfo]) -> Vec<String> {
    old.iter()
        .filter(|c| new.iter().any(|n| n.name == c.name))
        .map(|c| c.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::diff::ChangeKind;
    use pretty_assertions::assert_eq;

    fn columns() -> Vec<ColumnInfo> {
        vec![
            ColumnInfo::new("id", "INTEGER").primary_key().ordinal(0),
            ColumnInfo::new("name", "TEXT").ordinal(1),
            ColumnInfo::new("email", "TEXT").ordinal(2),
        ]
    }

    #[test]
    fn test_identical_columns_have_no_changes() {
        let comparator = SchemaComparator::new();
        assert!(comparator.compare_columns(&columns(), &columns()).is_empty());
    }

    #[test]
    fn test_reordered_columns_are_unchanged() {
        let mut reordered = columns();
        reordered.reverse();
        for (i, column) in reordered.iter_mut().enumerate() {
            column.ordinal = i;
        }
        assert!(SchemaComparator::new()
            .compare_columns(&columns(), &reordered)
            .is_empty());
    }

    #[test]
    fn test_added_removed_and_modified() {
        let old = vec![
            ColumnInfo::new("id", "INTEGER").primary_key(),
            ColumnInfo::new("amount", "INTEGER"),
            ColumnInfo::new("phone", "TEXT"),
        ];
        let new = vec![
            ColumnInfo::new("id", "INTEGER").primary_key(),
            ColumnInfo::new("amount", "REAL"),
            ColumnInfo::new("created", "TEXT").default_value("CURRENT_TIMESTAMP"),
        ];

        let changes = SchemaComparator::new().compare_columns(&old, &new);
        let summary: Vec<_> = changes.iter().map(|c| (c.kind(), c.name())).collect();
        assert_eq!(
            summary,
            vec![
                (ChangeKind::Added, "created"),
                (ChangeKind::Removed, "phone"),
                (ChangeKind::Modified, "amount"),
            ]
        );

        match &changes[2] {
            ColumnChange::Modified { old, new } => {
                assert_eq!(old.data_type, "INTEGER");
                assert_eq!(new.data_type, "REAL");
            }
            other => panic!("expected modified column, got {other:?}"),
        }
    }

    #[test]
    fn test_every_attribute_counts() {
        let base = ColumnInfo::new("c", "TEXT");
        let variants = [
            ColumnInfo::new("c", "VARCHAR"),
            ColumnInfo::new("c", "TEXT").not_null(),
            ColumnInfo::new("c", "TEXT").default_value("''"),
            ColumnInfo::new("c", "TEXT").primary_key(),
        ];
        for variant in variants {
            let changes = SchemaComparator::new()
                .compare_columns(std::slice::from_ref(&base), std::slice::from_ref(&variant));
            assert_eq!(changes.len(), 1, "{variant:?}");
            assert_eq!(changes[0].kind(), ChangeKind::Modified);
        }
    }

    #[test]
    fn test_case_insensitive_types() {
        let old = vec![ColumnInfo::new("c", "integer")];
        let new = vec![ColumnInfo::new("c", "INTEGER")];
        assert_eq!(SchemaComparator::new().compare_columns(&old, &new).len(), 1);
        assert!(SchemaComparator::new()
            .with_case_insensitive_types(true)
            .compare_columns(&old, &new)
            .is_empty());
    }

    #[test]
    fn test_coverage_is_exhaustive_and_disjoint() {
        let old = vec![
            ColumnInfo::new("a", "TEXT"),
            ColumnInfo::new("b", "TEXT"),
            ColumnInfo::new("c", "TEXT"),
        ];
        let new = vec![
            ColumnInfo::new("b", "INTEGER"),
            ColumnInfo::new("c", "TEXT"),
            ColumnInfo::new("d", "TEXT"),
        ];
        let changes = SchemaComparator::new().compare_columns(&old, &new);
        let mut names: Vec<_> = changes.iter().map(|c| c.name()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_common_columns_follow_old_order() {
        let old = vec![
            ColumnInfo::new("z", "TEXT"),
            ColumnInfo::new("gone", "TEXT"),
            ColumnInfo::new("a", "TEXT"),
        ];
        let new = vec![ColumnInfo::new("a", "TEXT"), ColumnInfo::new("z", "TEXT")];
        assert_eq!(common_columns(&old, &new), vec!["z", "a"]);
    }
}
