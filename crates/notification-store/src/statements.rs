//! The fixed set of SQL statements the store issues.
//!
//! Statements are compiled once through the connection's prepared-statement
//! cache, which is sized to hold the whole set.

use rusqlite::{CachedStatement, Connection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Statement {
    InsertNotification,
    UpdateNotification,
    DeleteNotification,
    NotificationExists,
    SelectNotifications,
    InsertAction,
    DeleteActions,
    SelectActions,
    InsertHint,
    DeleteHints,
    SelectHints,
}

impl Statement {
    pub(crate) const ALL: [Statement; 11] = [
        Statement::InsertNotification,
        Statement::UpdateNotification,
        Statement::DeleteNotification,
        Statement::NotificationExists,
        Statement::SelectNotifications,
        Statement::InsertAction,
        Statement::DeleteActions,
        Statement::SelectActions,
        Statement::InsertHint,
        Statement::DeleteHints,
        Statement::SelectHints,
    ];

    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::InsertNotification => {
                "INSERT INTO notifications (id, app_name, icon_name, summary, body, timeout, dest)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            }
            Self::UpdateNotification => {
                "UPDATE notifications SET app_name = ?2, icon_name = ?3, summary = ?4, body = ?5, timeout = ?6
                 WHERE id = ?1"
            }
            Self::DeleteNotification => "DELETE FROM notifications WHERE id = ?1",
            Self::NotificationExists => "SELECT 1 FROM notifications WHERE id = ?1",
            Self::SelectNotifications => {
                "SELECT id, app_name, icon_name, summary, body, timeout, dest
                 FROM notifications ORDER BY id"
            }
            Self::InsertAction => {
                "INSERT OR REPLACE INTO actions (id, label, nid) VALUES (?1, ?2, ?3)"
            }
            Self::DeleteActions => "DELETE FROM actions WHERE nid = ?1",
            Self::SelectActions => "SELECT id, label FROM actions WHERE nid = ?1 ORDER BY rowid",
            Self::InsertHint => {
                "INSERT OR REPLACE INTO hints (id, type, value, nid) VALUES (?1, ?2, ?3, ?4)"
            }
            Self::DeleteHints => "DELETE FROM hints WHERE nid = ?1",
            Self::SelectHints => "SELECT id, type, value FROM hints WHERE nid = ?1 ORDER BY id",
        }
    }
}

pub(crate) fn prepare(conn: &Connection, statement: Statement) -> rusqlite::Result<CachedStatement<'_>> {
    conn.prepare_cached(statement.sql())
}
