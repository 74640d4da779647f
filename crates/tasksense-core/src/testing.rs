//! Fixtures shared by unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{AiError, AiResult};
use crate::repository::{SimilarTask, SummaryRepository, TaskRepository};
use crate::summary::model::TaskSummary;
use crate::task::model::{Activity, NewTask, Task, TaskPriority, TaskStatus};

pub fn task(id: i64, title: &str, description: &str, priority: TaskPriority) -> Task {
    Task {
        id,
        title: title.into(),
        description: description.into(),
        status: TaskStatus::Todo,
        priority,
        estimate: None,
        assignee_id: None,
        assignee: None,
        reporter_id: 1,
        reporter: "alice".into(),
        due_date: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn similar(id: i64, estimate: f64) -> SimilarTask {
    SimilarTask {
        id,
        title: format!("Past task {}", id),
        description: format!("Description of past task {}", id),
        priority: "medium".into(),
        estimate,
        status: "done".into(),
    }
}

/// Read-only repository over a fixed set of tasks and history.
#[derive(Default)]
pub struct StaticTaskRepository {
    pub tasks: Vec<Task>,
    pub similar: Vec<SimilarTask>,
    pub estimates: Mutex<Vec<(i64, f64)>>,
}

impl StaticTaskRepository {
    pub fn new(tasks: Vec<Task>, similar: Vec<SimilarTask>) -> Self {
        Self {
            tasks,
            similar,
            estimates: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TaskRepository for StaticTaskRepository {
    async fn get_by_id(&self, id: i64) -> AiResult<Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(AiError::TaskNotFound(id))
    }

    async fn exists(&self, id: i64) -> AiResult<bool> {
        Ok(self.tasks.iter().any(|t| t.id == id))
    }

    async fn get_similar_tasks(&self, task: &Task, limit: usize) -> AiResult<Vec<SimilarTask>> {
        Ok(self
            .similar
            .iter()
            .filter(|s| s.id != task.id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn activities(&self, _task_id: i64) -> AiResult<Vec<Activity>> {
        Ok(Vec::new())
    }

    async fn activities_after(
        &self,
        _task_id: i64,
        _after_id: i64,
        _after_timestamp: DateTime<Utc>,
    ) -> AiResult<Vec<Activity>> {
        Ok(Vec::new())
    }

    async fn create(&self, _task: NewTask) -> AiResult<Task> {
        Err(AiError::Internal("read-only repository".into()))
    }

    async fn set_estimate(&self, task_id: i64, estimate: f64) -> AiResult<Task> {
        if let Ok(mut estimates) = self.estimates.lock() {
            estimates.push((task_id, estimate));
        }
        self.get_by_id(task_id).await
    }

    async fn user_exists(&self, user_id: i64) -> AiResult<bool> {
        Ok(user_id == 1)
    }

    async fn default_reporter(&self) -> AiResult<Option<i64>> {
        Ok(Some(1))
    }
}

/// Summary store held in memory; versions behave like the SQLite one.
#[derive(Default)]
pub struct MemorySummaryRepository {
    summaries: Mutex<Vec<TaskSummary>>,
}

fn lock_error() -> AiError {
    AiError::Internal("summary store poisoned".into())
}

#[async_trait]
impl SummaryRepository for MemorySummaryRepository {
    async fn get_by_task_id(&self, task_id: i64) -> AiResult<Option<TaskSummary>> {
        let summaries = self.summaries.lock().map_err(|_| lock_error())?;
        Ok(summaries.iter().find(|s| s.task_id == task_id).cloned())
    }

    async fn create(
        &self,
        task_id: i64,
        summary_text: &str,
        last_activity: Option<i64>,
        token_usage: i64,
    ) -> AiResult<TaskSummary> {
        let mut summaries = self.summaries.lock().map_err(|_| lock_error())?;
        if summaries.iter().any(|s| s.task_id == task_id) {
            return Err(AiError::Conflict(format!("summary for task {} exists", task_id)));
        }
        let summary = TaskSummary {
            id: summaries.len() as i64 + 1,
            task_id,
            summary_text: summary_text.into(),
            last_activity_processed: last_activity,
            last_activity_at: last_activity.map(|_| Utc::now()),
            token_usage,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        summaries.push(summary.clone());
        Ok(summary)
    }

    async fn update(
        &self,
        summary: &TaskSummary,
        summary_text: &str,
        last_activity: Option<i64>,
        additional_tokens: i64,
    ) -> AiResult<TaskSummary> {
        let mut summaries = self.summaries.lock().map_err(|_| lock_error())?;
        let stored = summaries
            .iter_mut()
            .find(|s| s.id == summary.id && s.version == summary.version)
            .ok_or_else(|| AiError::Conflict(format!("summary {} is stale", summary.id)))?;
        stored.summary_text = summary_text.into();
        if last_activity.is_some() {
            stored.last_activity_processed = last_activity;
            stored.last_activity_at = Some(Utc::now());
        }
        stored.token_usage += additional_tokens;
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_by_task_id(&self, task_id: i64) -> AiResult<bool> {
        let mut summaries = self.summaries.lock().map_err(|_| lock_error())?;
        let before = summaries.len();
        summaries.retain(|s| s.task_id != task_id);
        Ok(summaries.len() != before)
    }
}

/// Summary another writer stores just before the service's next write.
pub struct CompetingWrite {
    pub text: &'static str,
    pub last_activity: Option<i64>,
    pub tokens: i64,
}

/// Wraps a summary store so queued competing writes land first, making
/// the service's own write lose the race.
pub struct ContendedSummaryRepository<R> {
    inner: R,
    competing: Mutex<VecDeque<CompetingWrite>>,
    writes: AtomicUsize,
}

impl<R: SummaryRepository> ContendedSummaryRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            competing: Mutex::new(VecDeque::new()),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, write: CompetingWrite) {
        if let Ok(mut queue) = self.competing.lock() {
            queue.push_back(write);
        }
    }

    /// Writes attempted by the service, won or lost.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn interfere(&self, task_id: i64) -> AiResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let next = self.competing.lock().map_err(|_| lock_error())?.pop_front();
        let Some(write) = next else {
            return Ok(());
        };
        match self.inner.get_by_task_id(task_id).await? {
            Some(current) => {
                self.inner
                    .update(&current, write.text, write.last_activity, write.tokens)
                    .await?;
            }
            None => {
                self.inner
                    .create(task_id, write.text, write.last_activity, write.tokens)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R: SummaryRepository> SummaryRepository for ContendedSummaryRepository<R> {
    async fn get_by_task_id(&self, task_id: i64) -> AiResult<Option<TaskSummary>> {
        self.inner.get_by_task_id(task_id).await
    }

    async fn create(
        &self,
        task_id: i64,
        summary_text: &str,
        last_activity: Option<i64>,
        token_usage: i64,
    ) -> AiResult<TaskSummary> {
        self.interfere(task_id).await?;
        self.inner.create(task_id, summary_text, last_activity, token_usage).await
    }

    async fn update(
        &self,
        summary: &TaskSummary,
        summary_text: &str,
        last_activity: Option<i64>,
        additional_tokens: i64,
    ) -> AiResult<TaskSummary> {
        self.interfere(summary.task_id).await?;
        self.inner
            .update(summary, summary_text, last_activity, additional_tokens)
            .await
    }

    async fn delete_by_task_id(&self, task_id: i64) -> AiResult<bool> {
        self.inner.delete_by_task_id(task_id).await
    }
}
