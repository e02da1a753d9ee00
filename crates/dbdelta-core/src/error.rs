//! Error types for dbdelta

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core error type for dbdelta operations
#[derive(Error, Debug)]
pub enum DeltaError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema read error: {0}")]
    SchemaRead(String),

    #[error("Row read error: {0}")]
    RowRead(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl DeltaError {
    /// Returns the serializable category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DeltaError::Connection(_) => ErrorKind::Connection,
            DeltaError::NotFound(_) => ErrorKind::NotFound,
            DeltaError::SchemaRead(_) => ErrorKind::SchemaRead,
            DeltaError::RowRead(_) => ErrorKind::RowRead,
            DeltaError::Configuration(_) => ErrorKind::Configuration,
            DeltaError::Io(_) => ErrorKind::Io,
            DeltaError::Serialization(_) => ErrorKind::Serialization,
            DeltaError::Cancelled => ErrorKind::Cancelled,
            DeltaError::Other(_) => ErrorKind::Other,
        }
    }
}

/// Error category, kept on results so callers can tell failures apart
/// after the original error has been turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    NotFound,
    SchemaRead,
    RowRead,
    Configuration,
    Io,
    Serialization,
    Cancelled,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::Connection => "connection",
            ErrorKind::NotFound => "not found",
            ErrorKind::SchemaRead => "schema read",
            ErrorKind::RowRead => "row read",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Other => "other",
        };
        f.write_str(label)
    }
}

/// Result type alias for dbdelta operations
pub type Result<T> = std::result::Result<T, DeltaError>;
