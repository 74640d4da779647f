//! Task store: tasks, users and the activity log.
//!
//! Every write goes through here so the activity log stays in step with
//! the task row.

pub mod model;

use chrono::NaiveDate;
use tasksense_db::queries::activities as activity_queries;
use tasksense_db::queries::tasks::{self as queries, NewTaskRow, TaskUpdateRow};
use tasksense_db::queries::users as user_queries;
use tasksense_db::DbPool;

use crate::error::{AiError, AiResult};
use model::{format_estimate, Activity, ActivityKind, NewTask, Task, TaskChanges, User};

fn date_string(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Create a user.
pub fn create_user(pool: &DbPool, username: &str) -> AiResult<User> {
    let id = user_queries::create_user(pool, username.trim())?;
    Ok(User::from_row(user_queries::get_user(pool, id)?))
}

/// Get a user by id.
pub fn get_user(pool: &DbPool, id: i64) -> AiResult<User> {
    Ok(User::from_row(user_queries::get_user(pool, id)?))
}

/// List all users.
pub fn list_users(pool: &DbPool) -> AiResult<Vec<User>> {
    Ok(user_queries::list_users(pool)?
        .into_iter()
        .map(User::from_row)
        .collect())
}

/// Create a new task. A `created` activity is logged with it.
pub fn create_task(pool: &DbPool, task: &NewTask) -> AiResult<Task> {
    let due_date = date_string(task.due_date);
    let id = queries::create_task(
        pool,
        &NewTaskRow {
            title: &task.title,
            description: &task.description,
            status: task.status.as_str(),
            priority: task.priority.as_str(),
            estimate: task.estimate,
            assignee_id: task.assignee_id,
            reporter_id: task.reporter_id,
            due_date: due_date.as_deref(),
        },
    )?;

    tracing::info!(task_id = id, title = %task.title, "task created");
    get_task(pool, id)
}

/// Get a task by ID.
pub fn get_task(pool: &DbPool, id: i64) -> AiResult<Task> {
    match queries::get_task(pool, id) {
        Ok(row) => Ok(Task::from_row(row)),
        Err(tasksense_db::DbError::NotFound(_)) => Err(AiError::TaskNotFound(id)),
        Err(e) => Err(e.into()),
    }
}

pub fn task_exists(pool: &DbPool, id: i64) -> AiResult<bool> {
    Ok(queries::task_exists(pool, id)?)
}

/// List all tasks, newest first.
pub fn list_tasks(pool: &DbPool) -> AiResult<Vec<Task>> {
    Ok(queries::list_tasks(pool)?
        .into_iter()
        .map(Task::from_row)
        .collect())
}

/// Describe what changes between two versions of a task, one line per
/// tracked field.
pub fn describe_changes(old: &Task, new: &Task, assignee_name: Option<&str>) -> Vec<String> {
    let mut changes = Vec::new();

    if old.status != new.status {
        changes.push(format!(
            "Status changed from '{}' to '{}'",
            old.status.display_name(),
            new.status.display_name()
        ));
    }
    if old.assignee_id != new.assignee_id {
        changes.push(format!(
            "Assignee changed from '{}' to '{}'",
            old.assignee.as_deref().unwrap_or("Unassigned"),
            assignee_name.unwrap_or("Unassigned")
        ));
    }
    if old.priority != new.priority {
        changes.push(format!(
            "Priority changed from '{}' to '{}'",
            old.priority.display_name(),
            new.priority.display_name()
        ));
    }
    if old.estimate != new.estimate {
        changes.push(format!(
            "Estimate changed from '{}' to '{}'",
            old.estimate.map(format_estimate).unwrap_or_else(|| "None".into()),
            new.estimate.map(format_estimate).unwrap_or_else(|| "None".into())
        ));
    }

    changes
}

/// Apply changes to a task, logging one `field_change` activity per
/// changed tracked field (status, assignee, priority, estimate).
pub fn update_task(
    pool: &DbPool,
    id: i64,
    changes: &TaskChanges,
    acting_user: Option<i64>,
) -> AiResult<Task> {
    let old = get_task(pool, id)?;
    let mut new = old.clone();

    if let Some(title) = &changes.title {
        new.title = title.clone();
    }
    if let Some(description) = &changes.description {
        new.description = description.clone();
    }
    if let Some(status) = changes.status {
        new.status = status;
    }
    if let Some(priority) = changes.priority {
        new.priority = priority;
    }
    if let Some(estimate) = changes.estimate {
        new.estimate = estimate;
    }
    if let Some(assignee_id) = changes.assignee_id {
        new.assignee_id = assignee_id;
    }
    if let Some(due_date) = changes.due_date {
        new.due_date = due_date;
    }

    let assignee_name = match new.assignee_id {
        Some(user_id) if new.assignee_id != old.assignee_id => Some(get_user(pool, user_id)?.username),
        _ => new.assignee.clone(),
    };
    let descriptions = describe_changes(&old, &new, assignee_name.as_deref());
    let due_date = date_string(new.due_date);

    queries::update_task(
        pool,
        id,
        &TaskUpdateRow {
            title: &new.title,
            description: &new.description,
            status: new.status.as_str(),
            priority: new.priority.as_str(),
            estimate: new.estimate,
            assignee_id: new.assignee_id,
            due_date: due_date.as_deref(),
        },
        &descriptions,
        acting_user,
    )?;

    tracing::debug!(task_id = id, changes = descriptions.len(), "task updated");
    get_task(pool, id)
}

/// Append a comment to a task's activity log.
pub fn add_comment(pool: &DbPool, task_id: i64, user_id: Option<i64>, text: &str) -> AiResult<Activity> {
    if !task_exists(pool, task_id)? {
        return Err(AiError::TaskNotFound(task_id));
    }
    let id = activity_queries::create_activity(
        pool,
        task_id,
        ActivityKind::Comment.as_str(),
        text,
        user_id,
    )?;
    Ok(Activity::from_row(activity_queries::get_activity(pool, id)?))
}

/// All activities of a task, oldest first.
pub fn list_activities(pool: &DbPool, task_id: i64) -> AiResult<Vec<Activity>> {
    Ok(activity_queries::list_activities(pool, task_id)?
        .into_iter()
        .map(Activity::from_row)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{TaskPriority, TaskStatus};

    fn setup() -> (DbPool, User) {
        let pool = tasksense_db::init_in_memory().unwrap();
        let user = create_user(&pool, "alice").unwrap();
        (pool, user)
    }

    #[test]
    fn test_create_and_get_task() {
        let (pool, user) = setup();
        let mut new = NewTask::new("Fix login bug", "Users cannot log in", user.id);
        new.due_date = NaiveDate::from_ymd_opt(2030, 1, 15);
        let task = create_task(&pool, &new).unwrap();

        assert_eq!(task.reporter, "alice");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2030, 1, 15));
        assert!(matches!(get_task(&pool, 999), Err(AiError::TaskNotFound(999))));
    }

    #[test]
    fn test_update_logs_field_changes() {
        let (pool, user) = setup();
        let bob = create_user(&pool, "bob").unwrap();
        let task = create_task(&pool, &NewTask::new("Refactor", "Tidy up", user.id)).unwrap();

        let changes = TaskChanges {
            status: Some(TaskStatus::InProgress),
            priority: Some(TaskPriority::High),
            assignee_id: Some(Some(bob.id)),
            estimate: Some(Some(5.0)),
            ..Default::default()
        };
        let updated = update_task(&pool, task.id, &changes, Some(user.id)).unwrap();
        assert_eq!(updated.assignee.as_deref(), Some("bob"));

        let log: Vec<String> = list_activities(&pool, task.id)
            .unwrap()
            .into_iter()
            .filter(|a| a.kind == ActivityKind::FieldChange)
            .map(|a| a.description)
            .collect();
        assert_eq!(
            log,
            vec![
                "Status changed from 'To Do' to 'In Progress'",
                "Assignee changed from 'Unassigned' to 'bob'",
                "Priority changed from 'Medium' to 'High'",
                "Estimate changed from 'None' to '5'",
            ]
        );
    }

    #[test]
    fn test_update_without_changes_logs_nothing() {
        let (pool, user) = setup();
        let task = create_task(&pool, &NewTask::new("Same", "Same", user.id)).unwrap();
        update_task(&pool, task.id, &TaskChanges::default(), None).unwrap();
        assert_eq!(list_activities(&pool, task.id).unwrap().len(), 1);
    }

    #[test]
    fn test_add_comment() {
        let (pool, user) = setup();
        let task = create_task(&pool, &NewTask::new("Talk", "About it", user.id)).unwrap();
        let comment = add_comment(&pool, task.id, Some(user.id), "Looks good").unwrap();
        assert_eq!(comment.kind, ActivityKind::Comment);
        assert_eq!(comment.username.as_deref(), Some("alice"));
        assert!(add_comment(&pool, 404, None, "lost").is_err());
    }
}
