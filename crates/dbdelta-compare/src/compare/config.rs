//! Comparison settings

use dbdelta_core::{DeltaError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default name of the column that survives primary key regeneration
pub const DEFAULT_STABLE_IDENTIFIER: &str = "RowGUID";

/// Default number of tables compared at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Configuration for a comparison run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    /// Column used to match rows whose primary key changed. `None` disables
    /// stable identifier matching.
    pub stable_identifier: Option<String>,
    /// Maximum number of tables compared concurrently
    pub concurrency: usize,
    /// Tables left out of the comparison on both sides
    pub ignore_tables: Vec<String>,
    /// Whether column type labels are compared ignoring ASCII case
    pub case_insensitive_types: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            stable_identifier: Some(DEFAULT_STABLE_IDENTIFIER.to_string()),
            concurrency: DEFAULT_CONCURRENCY,
            ignore_tables: Vec::new(),
            case_insensitive_types: false,
        }
    }
}

impl CompareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: CompareConfig = toml::from_str(content)
            .map_err(|e| DeltaError::Configuration(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(DeltaError::Configuration(
                "concurrency must be at least 1".into(),
            ));
        }
        if let Some(column) = &self.stable_identifier
            && column.trim().is_empty()
        {
            return Err(DeltaError::Configuration(
                "stable_identifier must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Uses `column` as the stable identifier
    pub fn with_stable_identifier(mut self, column: impl Into<String>) -> Self {
        self.stable_identifier = Some(column.into());
        self
    }

    /// Matches rows by primary key and full row content only
    pub fn without_stable_identifier(mut self) -> Self {
        self.stable_identifier = None;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn ignore_table(mut self, table: impl Into<String>) -> Self {
        self.ignore_tables.push(table.into());
        self
    }

    /// Compares column type labels ignoring ASCII case
    pub fn case_insensitive_types(mut self) -> Self {
        self.case_insensitive_types = true;
        self
    }

    pub(crate) fn is_ignored(&self, table: &str) -> bool {
        self.ignore_tables.iter().any(|t| t == table)
    }
}
