//! Schema inspection traits and types

use crate::{Result, Row};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Reflection and row streaming over one database snapshot
///
/// Implementations are shared read-only between concurrent table
/// comparisons, so every method takes `&self`.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    /// Label identifying the snapshot, such as a file path
    fn location(&self) -> &str;

    /// List user table names, sorted. System tables are excluded.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Get columns for a table in declared order
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Get primary key column names, ordered by their position in the key.
    /// Empty when the table declares no primary key.
    async fn get_primary_key(&self, table: &str) -> Result<Vec<String>>;

    /// Push every row of `table` into `sink`, ordered as `order` describes.
    ///
    /// Rows are delivered one at a time and never collected by the
    /// implementation. Returns the number of rows delivered. An error from
    /// the sink stops the stream and is returned unchanged.
    async fn stream_rows(
        &self,
        table: &str,
        order: &RowOrder,
        sink: &mut dyn RowSink,
    ) -> Result<u64>;
}

/// Receiver for streamed rows
pub trait RowSink: Send {
    fn accept(&mut self, row: Row) -> Result<()>;
}

impl<F> RowSink for F
where
    F: FnMut(Row) -> Result<()> + Send,
{
    fn accept(&mut self, row: Row) -> Result<()> {
        self(row)
    }
}

/// Deterministic ordering used when streaming a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOrder {
    /// Order by the given columns, optionally followed by the implicit row id
    Columns {
        columns: Vec<String>,
        rowid_tiebreak: bool,
    },
    /// Order by the implicit row id only
    RowId,
}

impl RowOrder {
    /// Choose the ordering for a table: primary key columns in key order,
    /// else the first declared column with the row id as tiebreak, else the
    /// row id alone.
    pub fn for_table(columns: &[ColumnInfo], primary_key: &[String]) -> Self {
        if !primary_key.is_empty() {
            return RowOrder::Columns {
                columns: primary_key.to_vec(),
                rowid_tiebreak: false,
            };
        }
        match columns.first() {
            Some(first) => RowOrder::Columns {
                columns: vec![first.name.clone()],
                rowid_tiebreak: true,
            },
            None => RowOrder::RowId,
        }
    }
}

/// Column information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            ..Default::default()
        }
    }

    pub fn ordinal(mut self, ordinal: usize) -> Self {
        self.ordinal = ordinal;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Whether both columns have the same definition. The ordinal position
    /// is not part of the definition.
    pub fn same_definition(&self, other: &ColumnInfo, case_insensitive_types: bool) -> bool {
        let types_match = if case_insensitive_types {
            self.data_type.eq_ignore_ascii_case(&other.data_type)
        } else {
            self.data_type == other.data_type
        };
        types_match
            && self.nullable == other.nullable
            && self.default_value == other.default_value
            && self.is_primary_key == other.is_primary_key
    }
}

impl PartialEq for ColumnInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.same_definition(other, false)
    }
}

impl Eq for ColumnInfo {}

/// Reflected shape of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn row_order(&self) -> RowOrder {
        RowOrder::for_table(&self.columns, &self.primary_key)
    }
}
