//! Database schema definitions and migrations.

use rusqlite::Connection;

use crate::DbError;

pub const SCHEMA_VERSION: i64 = 1;

pub fn run_migrations(conn: &Connection) -> Result<(), DbError> {
    let version = schema_version(conn)?;
    conn.execute_batch(SCHEMA)?;
    if version < SCHEMA_VERSION {
        migrate_legacy_tables(conn)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<i64, DbError> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

/// Databases written before foreign keys were declared may hold hint and
/// action rows whose notification is gone.
fn migrate_legacy_tables(conn: &Connection) -> Result<(), DbError> {
    let hints = conn.execute(
        "DELETE FROM hints WHERE nid NOT IN (SELECT id FROM notifications)",
        [],
    )?;
    let actions = conn.execute(
        "DELETE FROM actions WHERE nid NOT IN (SELECT id FROM notifications)",
        [],
    )?;
    if hints + actions > 0 {
        tracing::info!(hints, actions, "Removed orphaned rows from legacy notification tables");
    }
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id        INTEGER PRIMARY KEY,
    app_name  VARCHAR(30)  NOT NULL,
    icon_name VARCHAR(50)  NOT NULL,
    summary   VARCHAR(100) NOT NULL,
    body      VARCHAR(100) NOT NULL,
    timeout   INTEGER DEFAULT 0,
    dest      VARCHAR(100) NOT NULL
);

CREATE TABLE IF NOT EXISTS hints (
    id        VARCHAR(50),
    type      INTEGER,
    value     VARCHAR(200) NOT NULL,
    nid       INTEGER REFERENCES notifications(id) ON DELETE CASCADE,
    PRIMARY KEY (id, nid)
);

CREATE TABLE IF NOT EXISTS actions (
    id        VARCHAR(50),
    label     VARCHAR(100) NOT NULL,
    nid       INTEGER REFERENCES notifications(id) ON DELETE CASCADE,
    PRIMARY KEY (id, nid)
);
"#;
