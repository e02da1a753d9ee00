//! dbdelta core - shared abstractions for database comparison
//!
//! This crate provides the types and traits every other dbdelta crate
//! depends on:
//!
//! - `SchemaInspector` - Trait for reflecting tables, columns and rows
//! - `SchemaCache` - Per-comparison memo of reflected table schemas
//! - `CancelHandle` - Thread-safe interruption of running reads
//! - Common types like `Value`, `Row` and `ColumnInfo`

mod cache;
mod connection;
mod error;
mod schema;
mod types;

pub use cache::*;
pub use connection::*;
pub use error::*;
pub use schema::*;
pub use types::*;
