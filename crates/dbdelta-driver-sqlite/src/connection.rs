//! SQLite connection implementation

use crate::schema;
use async_trait::async_trait;
use dbdelta_core::{
    CancelHandle, ColumnInfo, DeltaError, Result, Row, RowOrder, RowSink, SchemaInspector,
};
use parking_lot::Mutex;
use rusqlite::{Connection as RusqliteConnection, InterruptHandle, OpenFlags};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Rows buffered between the reading thread and the consumer
const ROW_CHANNEL_CAPACITY: usize = 256;

/// Cancel handle for a SQLite connection.
///
/// Marks the connection closed and interrupts the running statement. The
/// interrupted statement fails with SQLITE_INTERRUPT, which surfaces as
/// `DeltaError::Cancelled`.
pub struct SqliteCancelHandle {
    interrupt_handle: Arc<InterruptHandle>,
    closed: Arc<AtomicBool>,
}

impl CancelHandle for SqliteCancelHandle {
    fn cancel(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!("interrupting SQLite connection");
        self.interrupt_handle.interrupt();
    }

    fn is_cancelled(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Read-only SQLite connection
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
    interrupt_handle: Arc<InterruptHandle>,
    closed: Arc<AtomicBool>,
    location: String,
}

impl SqliteConnection {
    /// Open a SQLite database file read-only
    pub fn open(path: &str) -> Result<Self> {
        tracing::info!(path = %path, "opening SQLite database");
        let expanded_path = Self::expand_path(path)?;

        if !expanded_path.starts_with("file:") && !std::path::Path::new(&expanded_path).is_file()
        {
            return Err(DeltaError::Connection(format!(
                "Database file does not exist: {}",
                expanded_path
            )));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
            DeltaError::Connection(format!(
                "Failed to open SQLite database at '{}': {}",
                expanded_path, e
            ))
        })?;

        conn.pragma_update(None, "query_only", "ON")
            .map_err(|e| DeltaError::Connection(format!("Failed to enable query_only: {}", e)))?;

        // Taken before the connection moves into the mutex so it can be
        // used from any thread.
        let interrupt_handle = Arc::new(conn.get_interrupt_handle());

        tracing::info!(path = %expanded_path, "SQLite database opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt_handle,
            closed: Arc::new(AtomicBool::new(false)),
            location: path.to_string(),
        })
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                std::path::PathBuf::from(home)
                    .join(rest)
                    .to_string_lossy()
                    .to_string()
            } else {
                return Err(DeltaError::Configuration(
                    "Unable to determine HOME directory".into(),
                ));
            }
        } else if path.starts_with('~') {
            return Err(DeltaError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()
                .map_err(DeltaError::Io)?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// Handle that cancels reads on this connection from any thread
    pub fn cancel_handle(&self) -> Arc<dyn CancelHandle> {
        Arc::new(SqliteCancelHandle {
            interrupt_handle: self.interrupt_handle.clone(),
            closed: self.closed.clone(),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(DeltaError::Cancelled);
        }
        Ok(())
    }

    /// Run a catalog call on the blocking pool
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&RusqliteConnection) -> Result<T> + Send + 'static,
    {
        self.ensure_open()?;
        let conn = self.conn.clone();
        let closed = self.closed.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            if closed.load(Ordering::Acquire) {
                return Err(DeltaError::Cancelled);
            }
            f(&*conn)
        })
        .await
        .map_err(|e| DeltaError::Other(format!("SQLite worker failed: {}", e)))?
    }
}

#[async_trait]
impl SchemaInspector for SqliteConnection {
    fn location(&self) -> &str {
        &self.location
    }

    #[tracing::instrument(skip(self), fields(location = %self.location))]
    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self.with_connection(schema::list_tables).await?;
        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    #[tracing::instrument(skip(self), fields(location = %self.location))]
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        tracing::trace!(table = %table, "fetching column information");
        let table = table.to_string();
        self.with_connection(move |conn| schema::get_columns(conn, &table))
            .await
    }

    #[tracing::instrument(skip(self), fields(location = %self.location))]
    async fn get_primary_key(&self, table: &str) -> Result<Vec<String>> {
        let table = table.to_string();
        self.with_connection(move |conn| schema::get_primary_key(conn, &table))
            .await
    }

    #[tracing::instrument(skip(self, sink), fields(location = %self.location))]
    async fn stream_rows(
        &self,
        table: &str,
        order: &RowOrder,
        sink: &mut dyn RowSink,
    ) -> Result<u64> {
        self.ensure_open()?;

        let (tx, mut rx) = mpsc::channel::<Row>(ROW_CHANNEL_CAPACITY);
        let conn = self.conn.clone();
        let closed = self.closed.clone();
        let owned_table = table.to_string();
        let order = order.clone();

        let reader = tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            schema::scan_rows(&conn, &owned_table, &order, &closed, |row| {
                tx.blocking_send(row).is_ok()
            })
        });

        let mut delivered = 0u64;
        let mut sink_result = Ok(());
        while let Some(row) = rx.recv().await {
            if let Err(e) = sink.accept(row) {
                sink_result = Err(e);
                break;
            }
            delivered += 1;
        }
        // Dropping the receiver unblocks a reader waiting on a full channel.
        drop(rx);

        let read_result = reader
            .await
            .map_err(|e| DeltaError::Other(format!("SQLite worker failed: {}", e)))?;
        sink_result?;
        read_result?;

        // A cancel that lands after the last row still invalidates the read.
        if self.is_closed() {
            return Err(DeltaError::Cancelled);
        }

        tracing::debug!(table = %table, row_count = delivered, "rows streamed");
        Ok(delivered)
    }
}
