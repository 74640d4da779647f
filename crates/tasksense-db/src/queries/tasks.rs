//! Task-related database queries.

use crate::pool::{now_timestamp, DbError, DbPool, DbResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Task row from database, with usernames joined in.
#[derive(Debug, Clone)]
pub struct TaskRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub estimate: Option<f64>,
    pub assignee_id: Option<i64>,
    pub assignee: Option<String>,
    pub reporter_id: i64,
    pub reporter: String,
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Values for inserting a task.
#[derive(Debug, Clone)]
pub struct NewTaskRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub status: &'a str,
    pub priority: &'a str,
    pub estimate: Option<f64>,
    pub assignee_id: Option<i64>,
    pub reporter_id: i64,
    pub due_date: Option<&'a str>,
}

/// Mutable task columns written by [`update_task`].
#[derive(Debug, Clone)]
pub struct TaskUpdateRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub status: &'a str,
    pub priority: &'a str,
    pub estimate: Option<f64>,
    pub assignee_id: Option<i64>,
    pub due_date: Option<&'a str>,
}

const SELECT_TASK: &str = "SELECT t.id, t.title, t.description, t.status, t.priority, t.estimate,
            t.assignee_id, a.username, t.reporter_id, r.username, t.due_date,
            t.created_at, t.updated_at
     FROM tasks t
     JOIN users r ON r.id = t.reporter_id
     LEFT JOIN users a ON a.id = t.assignee_id";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        estimate: row.get(5)?,
        assignee_id: row.get(6)?,
        assignee: row.get(7)?,
        reporter_id: row.get(8)?,
        reporter: row.get(9)?,
        due_date: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn not_found(id: i64) -> impl FnOnce(rusqlite::Error) -> DbError {
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("Task: {}", id)),
        e => DbError::Connection(e),
    }
}

fn user_exists(conn: &Connection, id: i64) -> DbResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM users WHERE id = ?1", params![id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Create a task and its `created` activity in one transaction.
pub fn create_task(pool: &DbPool, task: &NewTaskRow<'_>) -> DbResult<i64> {
    pool.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        if !user_exists(&tx, task.reporter_id)? {
            return Err(DbError::NotFound(format!("User: {}", task.reporter_id)));
        }
        if let Some(assignee) = task.assignee_id {
            if !user_exists(&tx, assignee)? {
                return Err(DbError::NotFound(format!("User: {}", assignee)));
            }
        }

        let now = now_timestamp();
        tx.execute(
            "INSERT INTO tasks (title, description, status, priority, estimate,
                                assignee_id, reporter_id, due_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                task.title,
                task.description,
                task.status,
                task.priority,
                task.estimate,
                task.assignee_id,
                task.reporter_id,
                task.due_date,
                now
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO task_activities (task_id, activity_type, description, user_id, timestamp)
             VALUES (?1, 'created', ?2, ?3, ?4)",
            params![
                id,
                format!("Task '{}' was created", task.title),
                task.reporter_id,
                now
            ],
        )?;

        tx.commit()?;
        Ok(id)
    })
}

/// Get a task by ID.
pub fn get_task(pool: &DbPool, id: i64) -> DbResult<TaskRow> {
    pool.with_conn(|conn| {
        conn.query_row(&format!("{} WHERE t.id = ?1", SELECT_TASK), params![id], map_row)
            .map_err(not_found(id))
    })
}

/// Check whether a task exists.
pub fn task_exists(pool: &DbPool, id: i64) -> DbResult<bool> {
    pool.with_conn(|conn| {
        let found: Option<i64> = conn
            .query_row("SELECT id FROM tasks WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    })
}

/// List tasks, newest first.
pub fn list_tasks(pool: &DbPool) -> DbResult<Vec<TaskRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!("{} ORDER BY t.created_at DESC, t.id DESC", SELECT_TASK))?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Completed tasks with a positive estimate, most recently updated first.
///
/// `closed` is matched alongside `done` so imported rows using the older
/// status name still count as history.
pub fn list_completed_with_estimate(
    pool: &DbPool,
    exclude_id: i64,
    limit: usize,
) -> DbResult<Vec<TaskRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE t.estimate IS NOT NULL AND t.estimate > 0
                AND t.status IN ('done', 'closed')
                AND t.id != ?1
              ORDER BY t.updated_at DESC, t.id DESC
              LIMIT ?2",
            SELECT_TASK
        ))?;
        let rows = stmt
            .query_map(params![exclude_id, limit as i64], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Write new column values and append the given `field_change` activities
/// in one transaction. `updated_at` is bumped.
pub fn update_task(
    pool: &DbPool,
    id: i64,
    update: &TaskUpdateRow<'_>,
    changes: &[String],
    user_id: Option<i64>,
) -> DbResult<()> {
    pool.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        if let Some(assignee) = update.assignee_id {
            if !user_exists(&tx, assignee)? {
                return Err(DbError::NotFound(format!("User: {}", assignee)));
            }
        }

        let now = now_timestamp();
        let updated = tx.execute(
            "UPDATE tasks SET title = ?1, description = ?2, status = ?3, priority = ?4,
                              estimate = ?5, assignee_id = ?6, due_date = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                update.title,
                update.description,
                update.status,
                update.priority,
                update.estimate,
                update.assignee_id,
                update.due_date,
                now,
                id
            ],
        )?;
        if updated == 0 {
            return Err(DbError::NotFound(format!("Task: {}", id)));
        }

        for change in changes {
            tx.execute(
                "INSERT INTO task_activities (task_id, activity_type, description, user_id, timestamp)
                 VALUES (?1, 'field_change', ?2, ?3, ?4)",
                params![id, change, user_id, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    })
}

/// Delete a task; activities and summary cascade.
pub fn delete_task(pool: &DbPool, id: i64) -> DbResult<bool> {
    pool.with_conn(|conn| {
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    })
}
