//! SQLite catalog queries and row reading
//!
//! Everything here runs synchronously against a borrowed
//! `rusqlite::Connection`. `SqliteConnection` moves these calls onto the
//! blocking thread pool.

use dbdelta_core::{ColumnInfo, DeltaError, Result, Row, RowOrder, Value};
use rusqlite::ErrorCode;
use rusqlite::types::ValueRef;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const TABLE_INFO_SQL: &str =
    "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid";

/// Label used when a column declares no type. SQLite gives such columns
/// BLOB affinity.
const UNDECLARED_TYPE: &str = "BLOB";

/// Quote an identifier for use in SQL, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn order_by_clause(order: &RowOrder) -> String {
    match order {
        RowOrder::Columns {
            columns,
            rowid_tiebreak,
        } => {
            let mut terms: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
            if *rowid_tiebreak {
                terms.push("rowid".to_string());
            }
            terms.join(", ")
        }
        RowOrder::RowId => "rowid".to_string(),
    }
}

/// Whether the error was raised because the statement was interrupted
pub(crate) fn is_interrupt(error: &rusqlite::Error) -> bool {
    error.sqlite_error_code() == Some(ErrorCode::OperationInterrupted)
}

pub(crate) fn schema_error(context: &str, error: rusqlite::Error) -> DeltaError {
    if is_interrupt(&error) {
        return DeltaError::Cancelled;
    }
    DeltaError::SchemaRead(format!("{}: {}", context, error))
}

/// SQLite reports a dropped table only through the message text
fn is_missing_table(error: &rusqlite::Error) -> bool {
    error.to_string().contains("no such table")
}

pub(crate) fn row_error(context: &str, error: rusqlite::Error) -> DeltaError {
    if is_interrupt(&error) {
        return DeltaError::Cancelled;
    }
    if is_missing_table(&error) {
        return DeltaError::NotFound(format!("{}: {}", context, error));
    }
    DeltaError::RowRead(format!("{}: {}", context, error))
}

pub(crate) fn list_tables(conn: &rusqlite::Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(LIST_TABLES_SQL)
        .map_err(|e| schema_error("Failed to prepare table listing", e))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| schema_error("Failed to list tables", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| schema_error("Failed to read table name", e))?;
    Ok(names)
}

struct TableInfoRow {
    column: ColumnInfo,
    pk_position: i64,
}

fn table_info(conn: &rusqlite::Connection, table: &str) -> Result<Vec<TableInfoRow>> {
    let mut stmt = conn
        .prepare(TABLE_INFO_SQL)
        .map_err(|e| schema_error("Failed to prepare column query", e))?;
    let rows = stmt
        .query_map([table], |row| {
            let ordinal: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let declared: Option<String> = row.get(2)?;
            let not_null: i64 = row.get(3)?;
            let default_value: Option<String> = row.get(4)?;
            let pk_position: i64 = row.get(5)?;

            let data_type = match declared {
                Some(t) if !t.trim().is_empty() => t,
                _ => UNDECLARED_TYPE.to_string(),
            };

            Ok(TableInfoRow {
                column: ColumnInfo {
                    name,
                    ordinal: ordinal as usize,
                    data_type,
                    nullable: not_null == 0,
                    default_value,
                    is_primary_key: pk_position > 0,
                },
                pk_position,
            })
        })
        .map_err(|e| schema_error(&format!("Failed to read columns of '{}'", table), e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| schema_error(&format!("Failed to read columns of '{}'", table), e))?;

    // pragma_table_info yields nothing for a missing table
    if rows.is_empty() {
        return Err(DeltaError::NotFound(format!("Table '{}' not found", table)));
    }
    Ok(rows)
}

pub(crate) fn get_columns(conn: &rusqlite::Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    Ok(table_info(conn, table)?
        .into_iter()
        .map(|row| row.column)
        .collect())
}

pub(crate) fn get_primary_key(conn: &rusqlite::Connection, table: &str) -> Result<Vec<String>> {
    let mut key: Vec<(i64, String)> = table_info(conn, table)?
        .into_iter()
        .filter(|row| row.pk_position > 0)
        .map(|row| (row.pk_position, row.column.name))
        .collect();
    key.sort_by_key(|(position, _)| *position);
    Ok(key.into_iter().map(|(_, name)| name).collect())
}

/// Read the rows of `table` in `order`, handing each to `emit`.
///
/// `emit` returns `false` when the receiver has gone away, which ends the
/// scan early without error.
pub(crate) fn scan_rows(
    conn: &rusqlite::Connection,
    table: &str,
    order: &RowOrder,
    closed: &AtomicBool,
    mut emit: impl FnMut(Row) -> bool,
) -> Result<u64> {
    let sql = format!(
        "SELECT * FROM {} ORDER BY {}",
        quote_identifier(table),
        order_by_clause(order)
    );
    tracing::trace!(table = %table, sql = %sql, "scanning rows");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| row_error(&format!("Failed to prepare scan of '{}'", table), e))?;
    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>()
        .into();

    let mut rows = stmt
        .query([])
        .map_err(|e| row_error(&format!("Failed to scan '{}'", table), e))?;

    let mut count = 0u64;
    loop {
        if closed.load(Ordering::Acquire) {
            return Err(DeltaError::Cancelled);
        }
        let Some(row) = rows
            .next()
            .map_err(|e| row_error(&format!("Failed to fetch row from '{}'", table), e))?
        else {
            break;
        };

        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            let value = row
                .get_ref(idx)
                .map_err(|e| row_error(&format!("Failed to read value from '{}'", table), e))?;
            values.push(sqlite_to_value(value));
        }

        if !emit(Row::new(columns.clone(), values)) {
            break;
        }
        count += 1;
    }
    Ok(count)
}

fn sqlite_to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        // SQLite does not validate TEXT; keep undecodable bytes exact.
        ValueRef::Text(s) => match std::str::from_utf8(s) {
            Ok(text) => Value::Text(text.to_string()),
            Err(_) => Value::Blob(s.to_vec()),
        },
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}
