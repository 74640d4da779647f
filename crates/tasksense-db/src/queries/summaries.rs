//! Task summary queries.
//!
//! One summary per task. Updates are compare-and-swap on `version` and the
//! token counter is only ever incremented.

use crate::pool::{now_timestamp, DbError, DbPool, DbResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Summary row with the high-water mark's timestamp joined in.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub id: i64,
    pub task_id: i64,
    pub summary_text: String,
    pub last_activity_id: Option<i64>,
    pub last_activity_timestamp: Option<String>,
    pub token_usage: i64,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

const SELECT_SUMMARY: &str = "SELECT s.id, s.task_id, s.summary_text, s.last_activity_id, a.timestamp,
            s.token_usage, s.version, s.created_at, s.updated_at
     FROM task_summaries s
     LEFT JOIN task_activities a ON a.id = s.last_activity_id";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok(SummaryRow {
        id: row.get(0)?,
        task_id: row.get(1)?,
        summary_text: row.get(2)?,
        last_activity_id: row.get(3)?,
        last_activity_timestamp: row.get(4)?,
        token_usage: row.get(5)?,
        version: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn fetch_by_id(conn: &Connection, id: i64) -> DbResult<SummaryRow> {
    conn.query_row(&format!("{} WHERE s.id = ?1", SELECT_SUMMARY), params![id], map_row)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("Summary: {}", id)),
            e => DbError::Connection(e),
        })
}

/// The high-water mark must be an activity of the same task.
fn check_activity_owner(conn: &Connection, task_id: i64, activity_id: i64) -> DbResult<()> {
    let owner: Option<i64> = conn
        .query_row(
            "SELECT task_id FROM task_activities WHERE id = ?1",
            params![activity_id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        Some(owner) if owner == task_id => Ok(()),
        Some(owner) => Err(DbError::Constraint(format!(
            "activity {} belongs to task {}, not task {}",
            activity_id, owner, task_id
        ))),
        None => Err(DbError::NotFound(format!("Activity: {}", activity_id))),
    }
}

/// Get the summary of a task, if one exists.
pub fn get_summary_by_task(pool: &DbPool, task_id: i64) -> DbResult<Option<SummaryRow>> {
    pool.with_conn(|conn| {
        conn.query_row(
            &format!("{} WHERE s.task_id = ?1", SELECT_SUMMARY),
            params![task_id],
            map_row,
        )
        .optional()
        .map_err(DbError::from)
    })
}

/// Create the summary of a task.
///
/// Fails with [`DbError::Conflict`] if the task already has one.
pub fn create_summary(
    pool: &DbPool,
    task_id: i64,
    summary_text: &str,
    last_activity_id: Option<i64>,
    token_usage: i64,
) -> DbResult<SummaryRow> {
    pool.with_conn(|conn| {
        if let Some(activity_id) = last_activity_id {
            check_activity_owner(conn, task_id, activity_id)?;
        }

        let now = now_timestamp();
        conn.execute(
            "INSERT INTO task_summaries (task_id, summary_text, last_activity_id, token_usage,
                                         version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![task_id, summary_text, last_activity_id, token_usage.max(0), now],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::Conflict(format!("summary for task {} already exists or task is missing", task_id))
            }
            e => DbError::Connection(e),
        })?;

        fetch_by_id(conn, conn.last_insert_rowid())
    })
}

/// Replace the text, advance the high-water mark and add to the token
/// counter, provided the row is still at `expected_version`.
///
/// A `None` mark leaves the current one in place. A stale version yields
/// [`DbError::Conflict`].
pub fn update_summary(
    pool: &DbPool,
    id: i64,
    expected_version: i64,
    summary_text: &str,
    last_activity_id: Option<i64>,
    additional_tokens: i64,
) -> DbResult<SummaryRow> {
    pool.with_conn(|conn| {
        let current = fetch_by_id(conn, id)?;
        if let Some(activity_id) = last_activity_id {
            check_activity_owner(conn, current.task_id, activity_id)?;
        }

        let updated = conn.execute(
            "UPDATE task_summaries
             SET summary_text = ?1,
                 last_activity_id = COALESCE(?2, last_activity_id),
                 token_usage = token_usage + ?3,
                 version = version + 1,
                 updated_at = ?4
             WHERE id = ?5 AND version = ?6",
            params![
                summary_text,
                last_activity_id,
                additional_tokens.max(0),
                now_timestamp(),
                id,
                expected_version
            ],
        )?;

        if updated == 0 {
            return Err(DbError::Conflict(format!(
                "summary {} changed (expected version {})",
                id, expected_version
            )));
        }

        fetch_by_id(conn, id)
    })
}

/// Delete the summary of a task. Returns whether one existed.
pub fn delete_summary_by_task(pool: &DbPool, task_id: i64) -> DbResult<bool> {
    pool.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM task_summaries WHERE task_id = ?1", params![task_id])?;
        Ok(deleted > 0)
    })
}
