//! SQLite persistence layer for the notification daemon.
//!
//! Only persistent notifications are written here; the in-memory registry in
//! the daemon stays the source of truth for what is live.

pub mod batch;
pub mod hints;
pub mod models;
pub mod notifications;
pub mod schema;
mod statements;

#[cfg(test)]
mod tests;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

pub use batch::{BatchState, DEFAULT_COMMIT_DELAY};
pub use hints::{HintError, HintType, Hints, TypedValue};
pub use models::{Action, Notification};

/// Thread-safe database handle wrapping a single SQLite connection together
/// with its deferred-commit state.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Mutex<Inner>>,
}

pub(crate) struct Inner {
    pub(crate) conn: Connection,
    pub(crate) batch: batch::Batch,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DbError> {
        let db = Self {
            inner: Arc::new(Mutex::new(Inner {
                conn,
                batch: batch::Batch::new(DEFAULT_COMMIT_DELAY),
            })),
        };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    /// Change how long the batch stays open after the last finished unit.
    pub fn set_commit_delay(&self, delay: Duration) -> Result<(), DbError> {
        self.lock()?.batch.set_delay(delay);
        Ok(())
    }

    /// Access the underlying connection with a closure.
    pub fn with_conn<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Connection) -> Result<R, DbError>,
    {
        let inner = self.lock()?;
        f(&inner.conn)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Inner>, DbError> {
        self.inner.lock().map_err(|_| DbError::LockPoisoned)
    }

    fn configure(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "PRAGMA busy_timeout=5000;
                 PRAGMA foreign_keys=ON;",
            )?;
            conn.set_prepared_statement_cache_capacity(statements::Statement::ALL.len());
            Ok(())
        })
    }

    fn migrate(&self) -> Result<(), DbError> {
        self.with_conn(|conn| {
            schema::run_migrations(conn)?;
            Ok(())
        })
    }
}

/// Database error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Transaction error: {0}")]
    Transaction(String),
}
