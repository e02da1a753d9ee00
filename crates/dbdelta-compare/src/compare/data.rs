//! Row level comparison

use super::diff::RowChange;
use super::identity::IdentityKeys;
use super::schema::common_columns;
use crate::index::HierarchicalRowIndex;
use dbdelta_core::{Result, Row, SchemaInspector, TableSchema};

/// Matches the rows of a table present in both snapshots
pub struct RowComparator<'a> {
    old: &'a dyn SchemaInspector,
    new: &'a dyn SchemaInspector,
    stable_identifier: Option<&'a str>,
}

impl<'a> RowComparator<'a> {
    pub fn new(old: &'a dyn SchemaInspector, new: &'a dyn SchemaInspector) -> Self {
        Self {
            old,
            new,
            stable_identifier: None,
        }
    }

    /// Also match rows by this column when it exists on both sides
    pub fn with_stable_identifier(mut self, column: Option<&'a str>) -> Self {
        self.stable_identifier = column;
        self
    }

    /// Diff the rows of `table`.
    ///
    /// Old rows are indexed under their identity keys, then each new row
    /// claims at most one old row. A claimed pair is reported as modified
    /// when the rows carry different column sets or any common column
    /// differs. Unclaimed new rows are added, unclaimed old rows removed.
    #[tracing::instrument(skip(self, old_schema, new_schema))]
    pub async fn compare_data(
        &self,
        table: &str,
        old_schema: &TableSchema,
        new_schema: &TableSchema,
    ) -> Result<Vec<RowChange>> {
        let common = common_columns(&old_schema.columns, &new_schema.columns);
        let identity =
            IdentityKeys::for_table(old_schema, new_schema, &common, self.stable_identifier);
        tracing::debug!(
            primary_key = ?identity.primary_key(),
            stable_identifier = ?identity.stable_identifier(),
            common_columns = common.len(),
            "matching rows"
        );

        let mut index = HierarchicalRowIndex::new(|row: &Row| identity.keys(row));
        let old_count = {
            let mut sink = |row: Row| -> Result<()> {
                index.add(row);
                Ok(())
            };
            self.old
                .stream_rows(table, &old_schema.row_order(), &mut sink)
                .await?
        };

        let mut changes = Vec::new();
        let new_count = {
            let mut sink = |new: Row| -> Result<()> {
                match index.claim(&new) {
                    Some(old) => {
                        if rows_differ(&old, &new, &common) {
                            changes.push(RowChange::Modified { old, new });
                        }
                    }
                    None => changes.push(RowChange::Added { new }),
                }
                Ok(())
            };
            self.new
                .stream_rows(table, &new_schema.row_order(), &mut sink)
                .await?
        };

        changes.extend(index.remaining().map(|old| RowChange::Removed { old }));

        tracing::debug!(
            old_rows = old_count,
            new_rows = new_count,
            changed_rows = changes.len(),
            "rows compared"
        );
        Ok(changes)
    }
}

fn rows_differ(old: &Row, new: &Row, common: &[String]) -> bool {
    !old.has_same_columns(new)
        || common
            .iter()
            .any(|column| old.get_by_name(column) != new.get_by_name(column))
}

/// Every row of a table that exists on one side only, wrapped by `wrap`
pub(crate) async fn one_sided_rows(
    inspector: &dyn SchemaInspector,
    schema: &TableSchema,
    wrap: fn(Row) -> RowChange,
) -> Result<Vec<RowChange>> {
    let mut changes = Vec::new();
    let mut sink = |row: Row| -> Result<()> {
        changes.push(wrap(row));
        Ok(())
    };
    inspector
        .stream_rows(&schema.name, &schema.row_order(), &mut sink)
        .await?;
    Ok(changes)
}
