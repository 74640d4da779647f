//! User queries.

use crate::pool::{now_timestamp, DbError, DbPool, DbResult};
use rusqlite::{params, OptionalExtension};

/// User row from database.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}

/// Create a user and return its id.
pub fn create_user(pool: &DbPool, username: &str) -> DbResult<i64> {
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, now_timestamp()],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::Constraint(format!("username '{}' is taken", username))
            }
            e => DbError::Connection(e),
        })?;
        Ok(conn.last_insert_rowid())
    })
}

/// Get a user by id.
pub fn get_user(pool: &DbPool, id: i64) -> DbResult<UserRow> {
    pool.with_conn(|conn| {
        conn.query_row(
            "SELECT id, username, created_at FROM users WHERE id = ?1",
            params![id],
            map_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("User: {}", id)),
            e => DbError::Connection(e),
        })
    })
}

/// Look a user up by username.
pub fn find_user_by_username(pool: &DbPool, username: &str) -> DbResult<Option<UserRow>> {
    pool.with_conn(|conn| {
        conn.query_row(
            "SELECT id, username, created_at FROM users WHERE username = ?1",
            params![username],
            map_row,
        )
        .optional()
        .map_err(DbError::from)
    })
}

/// List all users ordered by id.
pub fn list_users(pool: &DbPool) -> DbResult<Vec<UserRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT id, username, created_at FROM users ORDER BY id")?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
