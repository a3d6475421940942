use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::errors::{PopulateError, Result};

/// The embedded SQL schema applied when initializing a new database.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// SQLite database holding media assets and content entries.
///
/// The connection sits behind a shared mutex so the database can be shared
/// across request handlers and moved into blocking tasks; every query holds
/// the lock for its own duration only. Clones share the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Creates a new database at `db_path`, creating parent directories if needed.
    ///
    /// Opens a SQLite connection, applies pragmas, and executes the schema.
    pub fn initialize(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PopulateError::Database {
                message: format!("failed to create database directory: {e}"),
                operation: "initialize".to_string(),
            })?;
        }

        let conn = Connection::open(db_path).map_err(|e| PopulateError::Database {
            message: format!("failed to open database: {e}"),
            operation: "initialize".to_string(),
        })?;

        Self::apply_pragmas(&conn)?;
        Self::apply_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an existing database at `db_path` and applies pragmas.
    pub fn open(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            return Err(PopulateError::Database {
                message: format!("no database found at '{}'", db_path.display()),
                operation: "open".to_string(),
            });
        }

        let conn = Connection::open(db_path).map_err(|e| PopulateError::Database {
            message: format!("failed to open database: {e}"),
            operation: "open".to_string(),
        })?;

        Self::apply_pragmas(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens a private in-memory database with the schema applied.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| PopulateError::Database {
            message: format!("failed to open in-memory database: {e}"),
            operation: "in_memory".to_string(),
        })?;
        Self::apply_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locks and returns the underlying SQLite connection.
    pub(crate) fn conn(&self, operation: &str) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| PopulateError::Database {
            message: "connection lock poisoned".to_string(),
            operation: operation.to_string(),
        })
    }

    /// Returns the on-disk size of the database in bytes.
    pub fn size(&self) -> Result<u64> {
        let size: i64 = self
            .conn("size")?
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get(0),
            )
            .map_err(|e| PopulateError::Database {
                message: format!("failed to get database size: {e}"),
                operation: "size".to_string(),
            })?;
        Ok(size as u64)
    }

    fn apply_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| PopulateError::Database {
                message: format!("failed to apply schema: {e}"),
                operation: "apply_schema".to_string(),
            })
    }

    /// Applies SQLite pragmas for a read-mostly workload.
    fn apply_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -16384;
             PRAGMA temp_store = MEMORY;",
        )
        .map_err(|e| PopulateError::Database {
            message: format!("failed to apply pragmas: {e}"),
            operation: "apply_pragmas".to_string(),
        })
    }
}
