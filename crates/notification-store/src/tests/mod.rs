use chrono::Utc;

use crate::{Action, Database, Hints, Notification, TypedValue};

fn test_db() -> Database {
    Database::open_in_memory().expect("Failed to create test DB")
}

fn sample(id: u32) -> Notification {
    let mut hints = Hints::new();
    hints.insert("persistent".into(), TypedValue::Byte(1));
    Notification {
        id,
        app_name: "Mail".into(),
        icon: "qgn_mail".into(),
        summary: "New message".into(),
        body: "From Bob".into(),
        actions: Vec::new(),
        hints,
        timeout: 0,
        destination: ":1.42".into(),
        created_at: Utc::now(),
    }
}

fn with_action(mut n: Notification, id: &str, label: &str) -> Notification {
    n.actions.push(Action::new(id, label));
    n
}

fn count(db: &Database, table: &str) -> i64 {
    db.with_conn(|conn| {
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(n)
    })
    .unwrap()
}
