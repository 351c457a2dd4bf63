use rusqlite::Connection;
use tracing::info;

use crate::error::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, notes)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'user'
                            CHECK (role IN ('user', 'admin')),
                created_at  INTEGER NOT NULL
            );

            CREATE TABLE notes (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title        TEXT NOT NULL DEFAULT '',
                content      TEXT NOT NULL DEFAULT '',
                color        TEXT NOT NULL DEFAULT '#ffffff',
                state        TEXT NOT NULL DEFAULT 'active'
                             CHECK (state IN ('active', 'archived', 'trashed')),
                reminder_at  INTEGER,
                created_at   INTEGER NOT NULL
            );

            CREATE INDEX idx_notes_owner_state ON notes(owner_id, state);
            CREATE INDEX idx_notes_reminder ON notes(reminder_at)
                WHERE reminder_at IS NOT NULL;

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn state_column_rejects_unknown_values() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute(
            "INSERT INTO users (id, username, password, created_at) VALUES ('u1', 'u1', 'x', 0)",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO notes (owner_id, title, state, created_at) VALUES ('u1', 't', 'deleted', 0)",
            [],
        );
        assert!(result.is_err());
    }
}
