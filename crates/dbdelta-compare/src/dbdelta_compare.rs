//! dbdelta compare - structured diffs of two database snapshots
//!
//! This crate provides:
//! - `Comparator` - Table set, schema and row comparison of two inspectors
//! - `HierarchicalRowIndex` - Multi-key row matching with claim semantics
//! - `Comparison` - The serializable result model
//! - JSON save and load of results

pub mod compare;
pub mod index;
pub mod persist;

pub use compare::*;
pub use index::HierarchicalRowIndex;
pub use persist::*;
