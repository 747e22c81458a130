//! Deferred, batched commits.
//!
//! The first write after an idle period opens a transaction that stays open
//! across many units of work. Each unit runs inside its own savepoint, so a
//! failing unit is undone without losing the rest of the batch. The actual
//! `COMMIT` happens from [`Database::commit_if_due`] once no unit has finished
//! for the configured delay.

use std::time::{Duration, Instant};

use rusqlite::Connection;

use crate::{Database, DbError, Inner};

/// Minimum quiet period between the last finished unit and the `COMMIT`.
pub const DEFAULT_COMMIT_DELAY: Duration = Duration::from_secs(8);

const SAVEPOINT: &str = "SAVEPOINT unit";
const RELEASE: &str = "RELEASE unit";
const ROLLBACK_UNIT: &str = "ROLLBACK TO unit; RELEASE unit";

/// Observable state of the batched transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Open {
        units: u32,
        commit_not_before: Instant,
    },
}

pub(crate) struct Batch {
    state: BatchState,
    delay: Duration,
    commits: u64,
}

impl Batch {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            state: BatchState::Idle,
            delay,
            commits: 0,
        }
    }

    pub(crate) fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    fn begin(&mut self, conn: &Connection) -> Result<(), DbError> {
        if let BatchState::Open { .. } = self.state {
            if !conn.is_autocommit() {
                return Ok(());
            }
            // SQLite ended the transaction on its own (e.g. after a fatal error).
            tracing::warn!("Batched transaction vanished, starting a new one");
            self.state = BatchState::Idle;
        }

        conn.execute_batch("BEGIN")
            .map_err(|e| DbError::Transaction(format!("BEGIN failed: {e}")))?;
        self.state = BatchState::Open {
            units: 0,
            commit_not_before: Instant::now() + self.delay,
        };
        Ok(())
    }

    fn finish_unit(&mut self, finished_at: Instant) {
        if let BatchState::Open {
            units,
            commit_not_before,
        } = &mut self.state
        {
            *units += 1;
            *commit_not_before = finished_at + self.delay;
        }
    }

    fn commit(&mut self, conn: &Connection) -> Result<(), DbError> {
        let result = conn.execute_batch("COMMIT");
        self.state = BatchState::Idle;

        match result {
            Ok(()) => {
                self.commits += 1;
                Ok(())
            }
            Err(e) => {
                tracing::error!("COMMIT failed, discarding batched writes: {e}");
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    tracing::debug!("ROLLBACK after failed COMMIT: {rollback}");
                }
                Err(DbError::Transaction(format!("COMMIT failed: {e}")))
            }
        }
    }
}

impl Database {
    /// Run `f` as one unit of work inside the batched transaction.
    ///
    /// On error only this unit is rolled back; the outer transaction stays
    /// open for the next write.
    pub fn unit_of_work<F, R>(&self, f: F) -> Result<R, DbError>
    where
        F: FnOnce(&Connection) -> Result<R, DbError>,
    {
        let mut guard = self.lock()?;
        let Inner { conn, batch } = &mut *guard;
        let conn: &Connection = conn;

        batch.begin(conn)?;
        conn.execute_batch(SAVEPOINT)
            .map_err(|e| DbError::Transaction(format!("SAVEPOINT failed: {e}")))?;

        let outcome = f(conn).and_then(|value| {
            conn.execute_batch(RELEASE)
                .map_err(|e| DbError::Transaction(format!("RELEASE failed: {e}")))?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                batch.finish_unit(Instant::now());
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = conn.execute_batch(ROLLBACK_UNIT) {
                    tracing::error!("Failed to roll back unit of work: {rollback}");
                }
                Err(e)
            }
        }
    }

    /// Commit the open batch if its quiet period has elapsed at `now`.
    ///
    /// Returns `true` when a `COMMIT` was issued.
    pub fn commit_if_due(&self, now: Instant) -> Result<bool, DbError> {
        let mut guard = self.lock()?;
        let Inner { conn, batch } = &mut *guard;
        let conn: &Connection = conn;

        match batch.state {
            BatchState::Open {
                commit_not_before, ..
            } if now >= commit_not_before => {
                batch.commit(conn)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Commit any open batch immediately, regardless of the quiet period.
    pub fn flush(&self) -> Result<bool, DbError> {
        let mut guard = self.lock()?;
        let Inner { conn, batch } = &mut *guard;
        let conn: &Connection = conn;

        if batch.state == BatchState::Idle {
            return Ok(false);
        }
        batch.commit(conn)?;
        Ok(true)
    }

    pub fn batch_state(&self) -> Result<BatchState, DbError> {
        Ok(self.lock()?.batch.state)
    }

    pub fn has_open_transaction(&self) -> Result<bool, DbError> {
        Ok(self.batch_state()? != BatchState::Idle)
    }

    /// Number of successful commits issued by this handle.
    pub fn commit_count(&self) -> Result<u64, DbError> {
        Ok(self.lock()?.batch.commits)
    }
}
