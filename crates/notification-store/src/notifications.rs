//! Durable copies of persistent notifications.

use chrono::Utc;
use rusqlite::{Connection, params};

use crate::hints::{self, Hints, TypedValue, keys};
use crate::models::{Action, Notification};
use crate::statements::{Statement, prepare};
use crate::{Database, DbError};

impl Database {
    pub fn insert_notification(&self, notification: &Notification) -> Result<(), DbError> {
        self.unit_of_work(|conn| insert_rows(conn, notification))
    }

    /// Rewrite a stored notification; its actions and hints are replaced.
    pub fn update_notification(&self, notification: &Notification) -> Result<(), DbError> {
        self.unit_of_work(|conn| {
            let changed = prepare(conn, Statement::UpdateNotification)?.execute(params![
                notification.id,
                notification.app_name,
                notification.icon,
                notification.summary,
                notification.body,
                notification.timeout,
            ])?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("notification {}", notification.id)));
            }
            prepare(conn, Statement::DeleteActions)?.execute([notification.id])?;
            prepare(conn, Statement::DeleteHints)?.execute([notification.id])?;
            insert_children(conn, notification)
        })
    }

    /// Returns whether a row was removed.
    pub fn delete_notification(&self, id: u32) -> Result<bool, DbError> {
        self.unit_of_work(|conn| {
            prepare(conn, Statement::DeleteActions)?.execute([id])?;
            prepare(conn, Statement::DeleteHints)?.execute([id])?;
            let removed = prepare(conn, Statement::DeleteNotification)?.execute([id])?;
            Ok(removed > 0)
        })
    }

    pub fn notification_exists(&self, id: u32) -> Result<bool, DbError> {
        self.with_conn(|conn| {
            let exists = prepare(conn, Statement::NotificationExists)?.exists([id])?;
            Ok(exists)
        })
    }

    /// Load every stored notification for replay at startup.
    ///
    /// Hint rows with an unknown type or unreadable payload are skipped.
    pub fn load_notifications(&self) -> Result<Vec<Notification>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = prepare(conn, Statement::SelectNotifications)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Notification {
                        id: row.get(0)?,
                        app_name: row.get(1)?,
                        icon: row.get(2)?,
                        summary: row.get(3)?,
                        body: row.get(4)?,
                        actions: Vec::new(),
                        hints: Hints::new(),
                        timeout: row.get::<_, Option<i32>>(5)?.unwrap_or(0),
                        destination: row.get(6)?,
                        created_at: Utc::now(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut loaded = Vec::with_capacity(rows.len());
            for mut notification in rows {
                notification.actions = load_actions(conn, notification.id)?;
                notification.hints = load_hints(conn, notification.id)?;
                notification
                    .hints
                    .insert(keys::PERSISTENT.to_string(), TypedValue::Byte(1));
                loaded.push(notification);
            }
            Ok(loaded)
        })
    }
}

pub(crate) fn insert_rows(conn: &Connection, notification: &Notification) -> Result<(), DbError> {
    prepare(conn, Statement::InsertNotification)?.execute(params![
        notification.id,
        notification.app_name,
        notification.icon,
        notification.summary,
        notification.body,
        notification.timeout,
        notification.destination,
    ])?;
    insert_children(conn, notification)
}

fn insert_children(conn: &Connection, notification: &Notification) -> Result<(), DbError> {
    let mut stmt = prepare(conn, Statement::InsertAction)?;
    for action in &notification.actions {
        stmt.execute(params![action.id, action.label, notification.id])?;
    }

    let mut stmt = prepare(conn, Statement::InsertHint)?;
    for (key, value) in &notification.hints {
        let (kind, text) = hints::encode(value);
        stmt.execute(params![key, kind.code(), text, notification.id])?;
    }
    Ok(())
}

fn load_actions(conn: &Connection, id: u32) -> Result<Vec<Action>, DbError> {
    let mut stmt = prepare(conn, Statement::SelectActions)?;
    let actions = stmt
        .query_map([id], |row| {
            Ok(Action {
                id: row.get(0)?,
                label: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(actions)
}

fn load_hints(conn: &Connection, id: u32) -> Result<Hints, DbError> {
    let mut stmt = prepare(conn, Statement::SelectHints)?;
    let rows = stmt.query_map([id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i64>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut hints = Hints::new();
    for row in rows {
        let (key, code, text) = row?;
        match hints::decode(code, &text) {
            Ok(value) => {
                hints.insert(key, value);
            }
            Err(e) => tracing::warn!(nid = id, hint = %key, "Skipping stored hint: {e}"),
        }
    }
    Ok(hints)
}
