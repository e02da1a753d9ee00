//! Row identity keys

use dbdelta_core::{Row, TableSchema, Value};

/// The column subset a [`RowKey`] was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyName {
    PrimaryKey,
    StableId,
    FullRow,
}

/// Values of a named column subset of one row.
///
/// Keys only compare equal when they come from the same subset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub name: KeyName,
    pub values: Vec<Value>,
}

impl RowKey {
    pub fn new(name: KeyName, values: Vec<Value>) -> Self {
        Self { name, values }
    }
}

/// Builds the ordered key list rows of one table are matched under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeys {
    primary_key: Vec<String>,
    stable_identifier: Option<String>,
    full_row: Vec<String>,
}

impl IdentityKeys {
    /// Decide the identity columns for a table present on both sides.
    ///
    /// The primary key takes part only when both sides declare the same
    /// key columns in the same order. The stable identifier takes part only
    /// when that column exists on both sides. The full row key covers
    /// `common_columns`.
    pub fn for_table(
        old: &TableSchema,
        new: &TableSchema,
        common_columns: &[String],
        stable_identifier: Option<&str>,
    ) -> Self {
        let primary_key = if !old.primary_key.is_empty() && old.primary_key == new.primary_key {
            old.primary_key.clone()
        } else {
            Vec::new()
        };

        let stable_identifier = stable_identifier
            .filter(|column| old.has_column(column) && new.has_column(column))
            .map(str::to_string);

        Self {
            primary_key,
            stable_identifier,
            full_row: common_columns.to_vec(),
        }
    }

    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn stable_identifier(&self) -> Option<&str> {
        self.stable_identifier.as_deref()
    }

    /// Keys for `row`, highest priority first.
    ///
    /// A primary key with any NULL part and a NULL stable identifier are
    /// skipped. The full row key is always produced unless there are no
    /// common columns, in which case a row can only match by its other
    /// keys.
    pub fn keys(&self, row: &Row) -> Vec<RowKey> {
        let mut keys = Vec::with_capacity(3);

        if !self.primary_key.is_empty() {
            let values: Option<Vec<Value>> = self
                .primary_key
                .iter()
                .map(|column| row.get_by_name(column).filter(|v| !v.is_null()).cloned())
                .collect();
            if let Some(values) = values {
                keys.push(RowKey::new(KeyName::PrimaryKey, values));
            }
        }

        if let Some(column) = &self.stable_identifier
            && let Some(value) = row.get_by_name(column).filter(|v| !v.is_null())
        {
            keys.push(RowKey::new(KeyName::StableId, vec![value.clone()]));
        }

        if !self.full_row.is_empty() {
            let values = self
                .full_row
                .iter()
                .map(|column| row.get_by_name(column).cloned().unwrap_or(Value::Null))
                .collect();
            keys.push(RowKey::new(KeyName::FullRow, values));
        }

        keys
    }
}
