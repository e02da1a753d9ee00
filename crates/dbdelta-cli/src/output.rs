//! Terminal rendering of comparison results

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use dbdelta_compare::{ChangeCounts, ColumnChange, Comparison, RowChange, TableComparison, TablePresence};
use dbdelta_core::Row;
use std::fmt::Write;

/// Short status label of a table result
pub fn table_status(table: &TableComparison) -> &'static str {
    if !table.is_complete() {
        return "incomplete";
    }
    match table.presence {
        TablePresence::Added => "added",
        TablePresence::Removed => "removed",
        TablePresence::Both if table.has_changes() => "changed",
        TablePresence::Both => "unchanged",
    }
}

fn status_color(status: &str) -> Color {
    match status {
        "added" => Color::Green,
        "removed" => Color::Red,
        "changed" => Color::Yellow,
        "incomplete" => Color::Magenta,
        _ => Color::Reset,
    }
}

fn counts_cell(counts: ChangeCounts) -> Cell {
    Cell::new(format!(
        "+{} -{} ~{}",
        counts.added, counts.removed, counts.modified
    ))
}

/// One line per table with column and row change counts
pub fn summary_table(comparison: &Comparison) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Table", "Status", "Columns", "Rows"]);

    for result in &comparison.changes {
        let status = table_status(result);
        table.add_row(vec![
            Cell::new(&result.name),
            Cell::new(status).fg(status_color(status)),
            counts_cell(result.column_counts()),
            counts_cell(result.row_counts()),
        ]);
    }
    table
}

fn describe_row(row: &Row) -> String {
    let fields: Vec<String> = row
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    fields.join(", ")
}

/// Every column and row change, grouped by table. Unchanged tables are
/// left out.
pub fn details(comparison: &Comparison) -> String {
    let mut out = String::new();
    for table in &comparison.changes {
        if !table.has_changes() && table.is_complete() {
            continue;
        }
        let _ = writeln!(out, "== {} ({})", table.name, table_status(table));
        if let Some(failure) = &table.failure {
            let _ = writeln!(out, "  ! {}", failure);
        }

        for change in &table.schema {
            let _ = match change {
                ColumnChange::Added { new } => {
                    writeln!(out, "  + column {} {}", new.name, new.data_type)
                }
                ColumnChange::Removed { old } => {
                    writeln!(out, "  - column {} {}", old.name, old.data_type)
                }
                ColumnChange::Modified { old, new } => writeln!(
                    out,
                    "  ~ column {} {} -> {}",
                    new.name, old.data_type, new.data_type
                ),
            };
        }

        for change in &table.data {
            let _ = match change {
                RowChange::Added { new } => writeln!(out, "  + {}", describe_row(new)),
                RowChange::Removed { old } => writeln!(out, "  - {}", describe_row(old)),
                RowChange::Modified { old, new } => writeln!(
                    out,
                    "  ~ {}\n    -> {}",
                    describe_row(old),
                    describe_row(new)
                ),
            };
        }
    }
    out
}
