//! Whole-database comparison
//!
//! Splits the two table lists into added, removed and common tables and
//! compares each table independently. A failure in one table is recorded on
//! that table's result and never stops the others.

use super::config::CompareConfig;
use super::data::{RowComparator, one_sided_rows};
use super::diff::{
    ColumnChange, Comparison, FailureStage, RowChange, TableComparison, TableFailure,
    TablePresence,
};
use super::schema::SchemaComparator;
use super::tables::TableSet;
use dbdelta_core::{DeltaError, Result, Row, SchemaCache, SchemaInspector};
use futures::{StreamExt, stream};

/// Compares two database snapshots
pub struct Comparator<'a> {
    old: &'a dyn SchemaInspector,
    new: &'a dyn SchemaInspector,
    config: CompareConfig,
}

/// Reflection caches for one run, one per side
struct RunCaches {
    old: SchemaCache,
    new: SchemaCache,
}

impl<'a> Comparator<'a> {
    /// Creates a comparator with the default configuration
    pub fn new(old: &'a dyn SchemaInspector, new: &'a dyn SchemaInspector) -> Self {
        Self::with_config(old, new, CompareConfig::default())
    }

    pub fn with_config(
        old: &'a dyn SchemaInspector,
        new: &'a dyn SchemaInspector,
        config: CompareConfig,
    ) -> Self {
        Self { old, new, config }
    }

    /// Compare every table of both snapshots.
    ///
    /// Fails only when a table list cannot be read. Each run reflects the
    /// schemas afresh.
    #[tracing::instrument(skip(self), fields(source = %self.old.location(), target = %self.new.location()))]
    pub async fn compare(&self) -> Result<Comparison> {
        let old_tables = self.list_tables(self.old).await?;
        let new_tables = self.list_tables(self.new).await?;
        let tables = TableSet::diff(old_tables, new_tables);
        tracing::debug!(
            added = tables.added.len(),
            removed = tables.removed.len(),
            common = tables.common.len(),
            "table sets compared"
        );

        let caches = RunCaches {
            old: SchemaCache::new(),
            new: SchemaCache::new(),
        };

        let changes: Vec<TableComparison> = stream::iter(tables.all())
            .map(|name| {
                let presence = if tables.added.contains(name) {
                    TablePresence::Added
                } else if tables.removed.contains(name) {
                    TablePresence::Removed
                } else {
                    TablePresence::Both
                };
                self.compare_table(name, presence, &caches)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let incomplete = changes.iter().filter(|t| !t.is_complete()).count();
        tracing::info!(
            tables = changes.len(),
            incomplete = incomplete,
            "comparison finished"
        );

        Ok(Comparison {
            source: self.old.location().to_string(),
            target: self.new.location().to_string(),
            changes,
        })
    }

    async fn list_tables(&self, inspector: &dyn SchemaInspector) -> Result<Vec<String>> {
        let tables = inspector.list_tables().await?;
        Ok(tables
            .into_iter()
            .filter(|t| {
                let ignored = self.config.is_ignored(t);
                if ignored {
                    tracing::debug!(table = %t, "ignoring table");
                }
                !ignored
            })
            .collect())
    }

    async fn compare_table(
        &self,
        name: &str,
        presence: TablePresence,
        caches: &RunCaches,
    ) -> TableComparison {
        let mut result = TableComparison::new(name);
        result.presence = presence;

        let outcome = match presence {
            TablePresence::Both => self.compare_common(&mut result, caches).await,
            TablePresence::Added => {
                self.compare_one_sided(&mut result, self.new, &caches.new)
                    .await
            }
            TablePresence::Removed => {
                self.compare_one_sided(&mut result, self.old, &caches.old)
                    .await
            }
        };

        if let Err((stage, error)) = outcome {
            tracing::warn!(table = %name, error = %error, "table comparison incomplete");
            result.failure = Some(TableFailure::new(stage, &error));
        } else {
            tracing::debug!(
                table = %name,
                column_changes = result.schema.len(),
                row_changes = result.data.len(),
                "table compared"
            );
        }
        result
    }

    async fn compare_common(
        &self,
        result: &mut TableComparison,
        caches: &RunCaches,
    ) -> std::result::Result<(), (FailureStage, DeltaError)> {
        let (old_schema, new_schema) = futures::try_join!(
            caches.old.table_schema(self.old, &result.name),
            caches.new.table_schema(self.new, &result.name)
        )
        .map_err(|e| (FailureStage::Schema, e))?;

        result.schema = SchemaComparator::new()
            .with_case_insensitive_types(self.config.case_insensitive_types)
            .compare_columns(&old_schema.columns, &new_schema.columns);

        result.data = RowComparator::new(self.old, self.new)
            .with_stable_identifier(self.config.stable_identifier.as_deref())
            .compare_data(&result.name, &old_schema, &new_schema)
            .await
            .map_err(|e| (FailureStage::Data, e))?;
        Ok(())
    }

    /// Report every column and row of a table found on one side only.
    /// `result.presence` says which side.
    async fn compare_one_sided(
        &self,
        result: &mut TableComparison,
        inspector: &dyn SchemaInspector,
        cache: &SchemaCache,
    ) -> std::result::Result<(), (FailureStage, DeltaError)> {
        let schema = cache
            .table_schema(inspector, &result.name)
            .await
            .map_err(|e| (FailureStage::Schema, e))?;

        let added = result.presence == TablePresence::Added;
        result.schema = schema
            .columns
            .iter()
            .cloned()
            .map(|column| {
                if added {
                    ColumnChange::Added { new: column }
                } else {
                    ColumnChange::Removed { old: column }
                }
            })
            .collect();

        let wrap: fn(Row) -> RowChange = if added {
            |new| RowChange::Added { new }
        } else {
            |old| RowChange::Removed { old }
        };
        result.data = one_sided_rows(inspector, &schema, wrap)
            .await
            .map_err(|e| (FailureStage::Data, e))?;
        Ok(())
    }
}
