//! Comparison result structures
//!
//! A [`Comparison`] holds one [`TableComparison`] per table found on either
//! side. Each table lists its column changes and its row changes.

use dbdelta_core::{ColumnInfo, DeltaError, ErrorKind, Row};
use serde::{Deserialize, Serialize};

/// The kind of a single change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// A column that differs between the two sides of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnChange {
    Added { new: ColumnInfo },
    Removed { old: ColumnInfo },
    Modified { old: ColumnInfo, new: ColumnInfo },
}

impl ColumnChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ColumnChange::Added { .. } => ChangeKind::Added,
            ColumnChange::Removed { .. } => ChangeKind::Removed,
            ColumnChange::Modified { .. } => ChangeKind::Modified,
        }
    }

    /// Name of the changed column
    pub fn name(&self) -> &str {
        match self {
            ColumnChange::Added { new } => &new.name,
            ColumnChange::Removed { old } | ColumnChange::Modified { old, .. } => &old.name,
        }
    }
}

/// A row that differs between the two sides of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowChange {
    Added { new: Row },
    Removed { old: Row },
    Modified { old: Row, new: Row },
}

impl RowChange {
    pub fn kind(&self) -> ChangeKind {
        match self {
            RowChange::Added { .. } => ChangeKind::Added,
            RowChange::Removed { .. } => ChangeKind::Removed,
            RowChange::Modified { .. } => ChangeKind::Modified,
        }
    }

    /// The old version of the row, if there is one
    pub fn old_row(&self) -> Option<&Row> {
        match self {
            RowChange::Added { .. } => None,
            RowChange::Removed { old } | RowChange::Modified { old, .. } => Some(old),
        }
    }

    /// The new version of the row, if there is one
    pub fn new_row(&self) -> Option<&Row> {
        match self {
            RowChange::Removed { .. } => None,
            RowChange::Added { new } | RowChange::Modified { new, .. } => Some(new),
        }
    }
}

/// Which sides a table exists on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TablePresence {
    #[default]
    Both,
    /// Only in the new snapshot
    Added,
    /// Only in the old snapshot
    Removed,
}

/// Stage at which a table comparison failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Columns or primary key could not be read; nothing was compared
    Schema,
    /// Rows could not be read; the schema diff is still valid
    Data,
}

/// Why a table could not be fully compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableFailure {
    pub stage: FailureStage,
    pub kind: ErrorKind,
    pub message: String,
}

impl TableFailure {
    pub fn new(stage: FailureStage, error: &DeltaError) -> Self {
        Self {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for TableFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self.stage {
            FailureStage::Schema => "schema",
            FailureStage::Data => "data",
        };
        write!(f, "{} comparison failed ({}): {}", stage, self.kind, self.message)
    }
}

/// Added/removed/modified tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl ChangeCounts {
    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Added => self.added += 1,
            ChangeKind::Removed => self.removed += 1,
            ChangeKind::Modified => self.modified += 1,
        }
    }
}

/// The differences found in one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableComparison {
    pub name: String,
    #[serde(default)]
    pub presence: TablePresence,
    pub schema: Vec<ColumnChange>,
    pub data: Vec<RowChange>,
    /// Set when the table could not be compared completely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TableFailure>,
}

impl TableComparison {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            presence: TablePresence::Both,
            schema: Vec::new(),
            data: Vec::new(),
            failure: None,
        }
    }

    /// Whether the comparison ran to completion. An incomplete table with
    /// no changes means "could not compare", not "no differences".
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Whether any column or row change was found
    pub fn has_changes(&self) -> bool {
        !self.schema.is_empty() || !self.data.is_empty()
    }

    pub fn column_counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for change in &self.schema {
            counts.record(change.kind());
        }
        counts
    }

    pub fn row_counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for change in &self.data {
            counts.record(change.kind());
        }
        counts
    }

    pub fn rows_of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &RowChange> {
        self.data.iter().filter(move |c| c.kind() == kind)
    }
}

/// Differences between two database snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    /// Location of the old snapshot
    pub source: String,
    /// Location of the new snapshot
    pub target: String,
    /// One entry per table, sorted by name
    pub changes: Vec<TableComparison>,
}

impl Comparison {
    pub fn table(&self, name: &str) -> Option<&TableComparison> {
        self.changes.iter().find(|t| t.name == name)
    }

    /// Whether no table has any change
    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|t| !t.has_changes())
    }

    /// Whether every table was compared completely
    pub fn is_complete(&self) -> bool {
        self.changes.iter().all(TableComparison::is_complete)
    }

    pub fn incomplete_tables(&self) -> impl Iterator<Item = &TableComparison> {
        self.changes.iter().filter(|t| !t.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_by_kind() {
        let mut table = TableComparison::new("t");
        table.schema.push(ColumnChange::Added {
            new: ColumnInfo::new("c", "TEXT"),
        });
        table.data.push(RowChange::Added {
            new: Row::from_pairs([("id", 1i64)]),
        });
        table.data.push(RowChange::Removed {
            old: Row::from_pairs([("id", 2i64)]),
        });
        table.data.push(RowChange::Removed {
            old: Row::from_pairs([("id", 3i64)]),
        });

        assert_eq!(
            table.column_counts(),
            ChangeCounts {
                added: 1,
                removed: 0,
                modified: 0
            }
        );
        let rows = table.row_counts();
        assert_eq!((rows.added, rows.removed, rows.modified), (1, 2, 0));
        assert_eq!(rows.total(), 3);
        assert_eq!(table.rows_of_kind(ChangeKind::Removed).count(), 2);
    }

    #[test]
    fn test_failed_table_is_not_complete() {
        let mut table = TableComparison::new("t");
        assert!(table.is_complete());
        assert!(!table.has_changes());

        table.failure = Some(TableFailure::new(
            FailureStage::Schema,
            &DeltaError::NotFound("t".into()),
        ));
        assert!(!table.is_complete());
        assert!(!table.has_changes());
        assert_eq!(
            table.failure.as_ref().map(|f| f.to_string()).as_deref(),
            Some("schema comparison failed (not found): Not found: t")
        );
    }

    #[test]
    fn test_change_json_shape() {
        let change = RowChange::Modified {
            old: Row::from_pairs([("id", 1i64)]),
            new: Row::from_pairs([("id", 2i64)]),
        };
        assert_eq!(
            serde_json::to_string(&change).unwrap(),
            r#"{"modified":{"old":{"id":1},"new":{"id":2}}}"#
        );
    }
}
