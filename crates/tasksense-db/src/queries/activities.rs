//! Task activity log queries. The log is append-only.

use crate::pool::{now_timestamp, DbError, DbPool, DbResult};
use rusqlite::params;

/// Activity row from database.
#[derive(Debug, Clone)]
pub struct ActivityRow {
    pub id: i64,
    pub task_id: i64,
    pub activity_type: String,
    pub description: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub timestamp: String,
}

const SELECT_ACTIVITY: &str = "SELECT a.id, a.task_id, a.activity_type, a.description,
            a.user_id, u.username, a.timestamp
     FROM task_activities a
     LEFT JOIN users u ON u.id = a.user_id";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        id: row.get(0)?,
        task_id: row.get(1)?,
        activity_type: row.get(2)?,
        description: row.get(3)?,
        user_id: row.get(4)?,
        username: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

/// Append an activity stamped with the current time.
pub fn create_activity(
    pool: &DbPool,
    task_id: i64,
    activity_type: &str,
    description: &str,
    user_id: Option<i64>,
) -> DbResult<i64> {
    create_activity_at(pool, task_id, activity_type, description, user_id, &now_timestamp())
}

/// Append an activity with an explicit timestamp (imports, backfills).
pub fn create_activity_at(
    pool: &DbPool,
    task_id: i64,
    activity_type: &str,
    description: &str,
    user_id: Option<i64>,
    timestamp: &str,
) -> DbResult<i64> {
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT INTO task_activities (task_id, activity_type, description, user_id, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![task_id, activity_type, description, user_id, timestamp],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::NotFound(format!("Task: {}", task_id))
            }
            e => DbError::Connection(e),
        })?;
        Ok(conn.last_insert_rowid())
    })
}

/// Get a single activity.
pub fn get_activity(pool: &DbPool, id: i64) -> DbResult<ActivityRow> {
    pool.with_conn(|conn| {
        conn.query_row(&format!("{} WHERE a.id = ?1", SELECT_ACTIVITY), params![id], map_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("Activity: {}", id))
                }
                e => DbError::Connection(e),
            })
    })
}

/// All activities of a task in chronological order.
pub fn list_activities(pool: &DbPool, task_id: i64) -> DbResult<Vec<ActivityRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE a.task_id = ?1 ORDER BY a.timestamp ASC, a.id ASC",
            SELECT_ACTIVITY
        ))?;
        let rows = stmt
            .query_map(params![task_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Activities recorded after the given one, in chronological order.
///
/// Ordering is by `(timestamp, id)`, so rows sharing the mark's timestamp
/// but inserted after it are still returned.
pub fn list_activities_after(
    pool: &DbPool,
    task_id: i64,
    after_timestamp: &str,
    after_id: i64,
) -> DbResult<Vec<ActivityRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE a.task_id = ?1
                AND (a.timestamp > ?2 OR (a.timestamp = ?2 AND a.id > ?3))
              ORDER BY a.timestamp ASC, a.id ASC",
            SELECT_ACTIVITY
        ))?;
        let rows = stmt
            .query_map(params![task_id, after_timestamp, after_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
