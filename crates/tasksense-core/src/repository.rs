//! Repository boundary between the AI services and the task store.
//!
//! Services only see these traits. [`RepositoryFactory`] wires the SQLite
//! implementations for production; tests substitute their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tasksense_db::queries::{activities, summaries, tasks as task_queries};
use tasksense_db::{format_timestamp, DbPool};

use crate::error::{AiError, AiResult};
use crate::summary::model::TaskSummary;
use crate::task;
use crate::task::model::{Activity, NewTask, Task, TaskChanges};

/// A completed task offered to the estimator as history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarTask {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub estimate: f64,
    pub status: String,
}

/// Read access to tasks and their activity log, plus the writes the
/// create-from-text flow needs.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> AiResult<Task>;

    async fn exists(&self, id: i64) -> AiResult<bool>;

    /// Completed tasks (`done`/`closed`) with a positive estimate,
    /// excluding `task`, most recently updated first, at most `limit`.
    async fn get_similar_tasks(&self, task: &Task, limit: usize) -> AiResult<Vec<SimilarTask>>;

    /// All activities of a task, oldest first.
    async fn activities(&self, task_id: i64) -> AiResult<Vec<Activity>>;

    /// Activities after the given one, oldest first.
    async fn activities_after(
        &self,
        task_id: i64,
        after_id: i64,
        after_timestamp: DateTime<Utc>,
    ) -> AiResult<Vec<Activity>>;

    async fn create(&self, task: NewTask) -> AiResult<Task>;

    /// Record an estimate (logged as a field change).
    async fn set_estimate(&self, task_id: i64, estimate: f64) -> AiResult<Task>;

    async fn user_exists(&self, user_id: i64) -> AiResult<bool>;

    /// Lowest-id user, used as reporter when a request names none.
    async fn default_reporter(&self) -> AiResult<Option<i64>>;
}

/// Storage for AI summaries, one per task.
#[async_trait]
pub trait SummaryRepository: Send + Sync {
    async fn get_by_task_id(&self, task_id: i64) -> AiResult<Option<TaskSummary>>;

    async fn create(
        &self,
        task_id: i64,
        summary_text: &str,
        last_activity: Option<i64>,
        token_usage: i64,
    ) -> AiResult<TaskSummary>;

    /// Replace the text, advance the high-water mark when `last_activity`
    /// is set, and add `additional_tokens` to the counter. Fails with
    /// [`AiError::Conflict`] if `summary` is no longer current.
    async fn update(
        &self,
        summary: &TaskSummary,
        summary_text: &str,
        last_activity: Option<i64>,
        additional_tokens: i64,
    ) -> AiResult<TaskSummary>;

    async fn delete_by_task_id(&self, task_id: i64) -> AiResult<bool>;
}

/// SQLite-backed [`TaskRepository`].
#[derive(Clone)]
pub struct SqliteTaskRepository {
    pool: DbPool,
}

impl SqliteTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    async fn get_by_id(&self, id: i64) -> AiResult<Task> {
        task::get_task(&self.pool, id)
    }

    async fn exists(&self, id: i64) -> AiResult<bool> {
        task::task_exists(&self.pool, id)
    }

    async fn get_similar_tasks(&self, task: &Task, limit: usize) -> AiResult<Vec<SimilarTask>> {
        let rows = task_queries::list_completed_with_estimate(&self.pool, task.id, limit)?;
        Ok(rows
            .into_iter()
            .map(|row| SimilarTask {
                id: row.id,
                title: row.title,
                description: row.description,
                priority: row.priority,
                estimate: row.estimate.unwrap_or_default(),
                status: row.status,
            })
            .collect())
    }

    async fn activities(&self, task_id: i64) -> AiResult<Vec<Activity>> {
        task::list_activities(&self.pool, task_id)
    }

    async fn activities_after(
        &self,
        task_id: i64,
        after_id: i64,
        after_timestamp: DateTime<Utc>,
    ) -> AiResult<Vec<Activity>> {
        let rows = activities::list_activities_after(
            &self.pool,
            task_id,
            &format_timestamp(&after_timestamp),
            after_id,
        )?;
        Ok(rows.into_iter().map(Activity::from_row).collect())
    }

    async fn create(&self, new: NewTask) -> AiResult<Task> {
        task::create_task(&self.pool, &new)
    }

    async fn set_estimate(&self, task_id: i64, estimate: f64) -> AiResult<Task> {
        let changes = TaskChanges {
            estimate: Some(Some(estimate)),
            ..Default::default()
        };
        task::update_task(&self.pool, task_id, &changes, None)
    }

    async fn user_exists(&self, user_id: i64) -> AiResult<bool> {
        match task::get_user(&self.pool, user_id) {
            Ok(_) => Ok(true),
            Err(AiError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn default_reporter(&self) -> AiResult<Option<i64>> {
        Ok(task::list_users(&self.pool)?.first().map(|u| u.id))
    }
}

/// SQLite-backed [`SummaryRepository`].
#[derive(Clone)]
pub struct SqliteSummaryRepository {
    pool: DbPool,
}

impl SqliteSummaryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SummaryRepository for SqliteSummaryRepository {
    async fn get_by_task_id(&self, task_id: i64) -> AiResult<Option<TaskSummary>> {
        Ok(summaries::get_summary_by_task(&self.pool, task_id)?.map(TaskSummary::from_row))
    }

    async fn create(
        &self,
        task_id: i64,
        summary_text: &str,
        last_activity: Option<i64>,
        token_usage: i64,
    ) -> AiResult<TaskSummary> {
        let row = summaries::create_summary(&self.pool, task_id, summary_text, last_activity, token_usage)?;
        tracing::info!(task_id, tokens = token_usage, "summary created");
        Ok(TaskSummary::from_row(row))
    }

    async fn update(
        &self,
        summary: &TaskSummary,
        summary_text: &str,
        last_activity: Option<i64>,
        additional_tokens: i64,
    ) -> AiResult<TaskSummary> {
        let row = summaries::update_summary(
            &self.pool,
            summary.id,
            summary.version,
            summary_text,
            last_activity,
            additional_tokens,
        )?;
        tracing::info!(task_id = summary.task_id, tokens = additional_tokens, "summary updated");
        Ok(TaskSummary::from_row(row))
    }

    async fn delete_by_task_id(&self, task_id: i64) -> AiResult<bool> {
        let deleted = summaries::delete_summary_by_task(&self.pool, task_id)?;
        if deleted {
            tracing::info!(task_id, "summary deleted");
        }
        Ok(deleted)
    }
}

/// Production wiring for the repository traits.
#[derive(Clone)]
pub struct RepositoryFactory {
    pool: DbPool,
}

impl RepositoryFactory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn task_repository(&self) -> Arc<dyn TaskRepository> {
        Arc::new(SqliteTaskRepository::new(self.pool.clone()))
    }

    pub fn summary_repository(&self) -> Arc<dyn SummaryRepository> {
        Arc::new(SqliteSummaryRepository::new(self.pool.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::TaskStatus;

    fn done_task(pool: &DbPool, reporter: i64, title: &str, estimate: Option<f64>) -> Task {
        let mut new = NewTask::new(title, "done work", reporter);
        new.status = TaskStatus::Done;
        new.estimate = estimate;
        task::create_task(pool, &new).unwrap()
    }

    #[tokio::test]
    async fn test_similar_tasks_respect_rules() {
        let pool = tasksense_db::init_in_memory().unwrap();
        let user = task::create_user(&pool, "u").unwrap();
        let repo = RepositoryFactory::new(pool.clone()).task_repository();

        let target = done_task(&pool, user.id, "Target", Some(2.0));
        for i in 0..4 {
            done_task(&pool, user.id, &format!("History {}", i), Some(1.0 + i as f64));
        }
        done_task(&pool, user.id, "Unestimated", None);
        task::create_task(&pool, &NewTask::new("Open", "not done", user.id)).unwrap();

        let similar = repo.get_similar_tasks(&target, 3).await.unwrap();
        assert_eq!(similar.len(), 3);
        for entry in &similar {
            assert_ne!(entry.id, target.id);
            assert!(entry.estimate > 0.0);
            assert!(entry.status == "done" || entry.status == "closed");
        }
        assert_eq!(similar[0].title, "History 3");
    }

    #[tokio::test]
    async fn test_user_lookup_and_default_reporter() {
        let pool = tasksense_db::init_in_memory().unwrap();
        let repo = SqliteTaskRepository::new(pool.clone());
        assert_eq!(repo.default_reporter().await.unwrap(), None);

        let first = task::create_user(&pool, "first").unwrap();
        task::create_user(&pool, "second").unwrap();
        assert_eq!(repo.default_reporter().await.unwrap(), Some(first.id));
        assert!(repo.user_exists(first.id).await.unwrap());
        assert!(!repo.user_exists(999).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_estimate_logs_change() {
        let pool = tasksense_db::init_in_memory().unwrap();
        let user = task::create_user(&pool, "u").unwrap();
        let repo = SqliteTaskRepository::new(pool.clone());
        let created = repo.create(NewTask::new("Plan", "Plan it", user.id)).await.unwrap();

        let updated = repo.set_estimate(created.id, 4.5).await.unwrap();
        assert_eq!(updated.estimate, Some(4.5));
        let log = repo.activities(created.id).await.unwrap();
        assert_eq!(log.last().unwrap().description, "Estimate changed from 'None' to '4.5'");
    }

    #[tokio::test]
    async fn test_summary_repository_roundtrip() {
        let pool = tasksense_db::init_in_memory().unwrap();
        let user = task::create_user(&pool, "u").unwrap();
        let created = task::create_task(&pool, &NewTask::new("S", "S", user.id)).unwrap();
        let factory = RepositoryFactory::new(pool.clone());
        let summaries = factory.summary_repository();

        assert!(summaries.get_by_task_id(created.id).await.unwrap().is_none());
        let summary = summaries.create(created.id, "first", None, 3).await.unwrap();
        let updated = summaries.update(&summary, "second", None, 4).await.unwrap();
        assert_eq!(updated.token_usage, 7);

        // the stale copy can no longer be written
        let stale = summaries.update(&summary, "third", None, 1).await;
        assert!(matches!(stale, Err(AiError::Conflict(_))));

        assert!(summaries.delete_by_task_id(created.id).await.unwrap());
    }
}
