//! Database comparison
//!
//! Compares two snapshots of the same logical schema table by table:
//! columns by name, rows by identity keys.

mod comparator;
mod config;
mod data;
mod diff;
mod identity;
mod schema;
mod tables;


pub use comparator::*;
pub use config::*;
pub use data::RowComparator;
pub use diff::*;
pub use identity::*;
pub use schema::*;
pub use tables::*;
