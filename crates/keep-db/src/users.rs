use chrono::Utc;
use keep_types::models::{Role, User};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use uuid::Uuid;

use crate::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::{UserRow, to_millis};

const USER_COLUMNS: &str = "id, username, password, role, created_at";

impl Database {
    pub fn create_user(
        &self,
        id: Uuid,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let result = conn.execute(
                "INSERT INTO users (id, username, password, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    username,
                    password_hash,
                    role.as_str(),
                    to_millis(Utc::now()),
                ],
            );

            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::Conflict(format!("username '{}' is taken", username)))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", &id.to_string()))
    }

    pub fn list_users(&self) -> StoreResult<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, username ASC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], UserRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter().map(User::try_from).collect()
        })
    }

    /// Removes the account and, through the foreign key, all of its notes.
    pub fn delete_user(&self, id: Uuid) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    pub fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?2 WHERE id = ?1",
                params![id.to_string(), password_hash],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let row = conn.query_row(&sql, [value], UserRow::from_row).optional()?;
    Ok(row)
}
