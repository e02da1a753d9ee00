//! Per-comparison memo of reflected table schemas

use crate::{Result, SchemaInspector, TableSchema};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Caches the columns and primary key of each table reflected during one
/// comparison run.
///
/// A cache belongs to a single run and a single inspector. Nothing is
/// shared between runs, so a new snapshot is always reflected afresh.
#[derive(Default)]
pub struct SchemaCache {
    tables: Mutex<HashMap<String, Arc<TableSchema>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the schema of `table`, reflecting it through `inspector` on
    /// first use. Failures are not cached.
    pub async fn table_schema(
        &self,
        inspector: &dyn SchemaInspector,
        table: &str,
    ) -> Result<Arc<TableSchema>> {
        let cached = self.tables.lock().get(table).cloned();
        if let Some(schema) = cached {
            tracing::trace!(table = %table, "schema cache hit");
            return Ok(schema);
        }

        let columns = inspector.get_columns(table).await?;
        let primary_key = inspector.get_primary_key(table).await?;
        let schema = Arc::new(TableSchema {
            name: table.to_string(),
            columns,
            primary_key,
        });

        // Concurrent misses for the same table keep whichever landed first.
        let mut tables = self.tables.lock();
        let entry = tables
            .entry(table.to_string())
            .or_insert_with(|| schema.clone());
        Ok(entry.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.lock().is_empty()
    }
}
