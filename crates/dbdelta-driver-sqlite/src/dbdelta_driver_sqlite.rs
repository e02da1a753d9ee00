//! SQLite schema inspector
//!
//! Opens database files read-only and exposes their tables, columns and
//! rows through `dbdelta_core::SchemaInspector`.

mod connection;
mod schema;

pub use connection::{SqliteCancelHandle, SqliteConnection};
pub use schema::quote_identifier;
