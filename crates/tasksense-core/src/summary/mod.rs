//! Incremental task summaries.
//!
//! A summary remembers the last activity it folded in. Each request only
//! sends the activities after that mark to the provider, so repeated calls
//! with nothing new cost nothing.

pub mod analyzer;
pub mod model;
pub mod provider;

pub use analyzer::SummaryQuality;
pub use model::TaskSummary;
pub use provider::{OpenAiSummaryProvider, SummaryProvider};

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::repository::{RepositoryFactory, SummaryRepository, TaskRepository};
use crate::task::model::{format_estimate, Task};

/// Attempts before a lost optimistic update is reported.
const MAX_ATTEMPTS: usize = 3;

pub struct SummaryService {
    provider: SummaryProvider,
    tasks: Arc<dyn TaskRepository>,
    summaries: Arc<dyn SummaryRepository>,
}

impl SummaryService {
    pub fn new(
        provider: SummaryProvider,
        tasks: Arc<dyn TaskRepository>,
        summaries: Arc<dyn SummaryRepository>,
    ) -> Self {
        info!(provider = provider.name(), "summary service initialized");
        Self {
            provider,
            tasks,
            summaries,
        }
    }

    pub fn from_config(config: &AiConfig, repositories: &RepositoryFactory) -> AiResult<Self> {
        Ok(Self::new(
            SummaryProvider::from_config(config)?,
            repositories.task_repository(),
            repositories.summary_repository(),
        ))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Create the summary of a task, or fold its new activities into the
    /// existing one.
    pub async fn create_or_update_summary(&self, task_id: i64) -> AiResult<TaskSummary> {
        let task = self.tasks.get_by_id(task_id).await?;

        let mut attempt = 1;
        loop {
            let outcome = match self.summaries.get_by_task_id(task_id).await? {
                None => self.create_summary(&task).await,
                Some(existing) => self.update_summary(&task, existing).await,
            };

            match outcome {
                Err(AiError::Conflict(reason)) if attempt < MAX_ATTEMPTS => {
                    warn!(task_id, attempt, %reason, "summary changed concurrently, retrying");
                    attempt += 1;
                }
                Err(err) => {
                    error!(task_id, error = %err, "summary generation failed");
                    return Err(err);
                }
                ok => return ok,
            }
        }
    }

    async fn create_summary(&self, task: &Task) -> AiResult<TaskSummary> {
        let activities = self.tasks.activities(task.id).await?;

        let Some(last) = activities.last() else {
            info!(task_id = task.id, "no activities, creating basic summary");
            return self
                .summaries
                .create(task.id, &basic_summary(task), None, 0)
                .await;
        };

        let generated = self.provider.generate(task, &activities, None).await?;
        self.summaries
            .create(task.id, &generated.text, Some(last.id), generated.tokens_used)
            .await
    }

    async fn update_summary(&self, task: &Task, existing: TaskSummary) -> AiResult<TaskSummary> {
        let new_activities = match (existing.last_activity_processed, existing.last_activity_at) {
            (Some(after_id), Some(after_at)) => {
                self.tasks.activities_after(task.id, after_id, after_at).await?
            }
            _ => self.tasks.activities(task.id).await?,
        };

        let Some(last) = new_activities.last() else {
            info!(task_id = task.id, "no new activities, returning existing summary");
            return Ok(existing);
        };

        info!(task_id = task.id, count = new_activities.len(), "updating summary");
        let generated = self
            .provider
            .generate(task, &new_activities, Some(&existing.summary_text))
            .await?;
        self.summaries
            .update(&existing, &generated.text, Some(last.id), generated.tokens_used)
            .await
    }

    pub async fn get_summary(&self, task_id: i64) -> AiResult<Option<TaskSummary>> {
        self.summaries.get_by_task_id(task_id).await
    }

    /// Returns whether a summary was removed.
    pub async fn delete_summary(&self, task_id: i64) -> AiResult<bool> {
        self.summaries.delete_by_task_id(task_id).await
    }

    pub async fn analyze_summary_quality(&self, task_id: i64) -> AiResult<SummaryQuality> {
        let summary = self.summaries.get_by_task_id(task_id).await?;
        Ok(analyzer::analyze_quality(summary.as_ref(), Utc::now()))
    }

    pub async fn suggest_improvements(&self, task_id: i64) -> AiResult<Vec<String>> {
        let summary = self.summaries.get_by_task_id(task_id).await?;
        Ok(analyzer::suggest_improvements(summary.as_ref()))
    }
}

/// Summary synthesized from the task fields when there is no history.
pub fn basic_summary(task: &Task) -> String {
    let mut parts = vec![format!(
        "Task '{}' was created with {} status and {} priority.",
        task.title,
        task.status.display_name(),
        task.priority.display_name()
    )];

    if let Some(assignee) = &task.assignee {
        parts.push(format!("Assigned to {}.", assignee));
    }
    if let Some(estimate) = task.estimate.filter(|e| *e != 0.0) {
        parts.push(format!("Estimated effort: {} story points.", format_estimate(estimate)));
    }
    if let Some(due) = task.due_date {
        parts.push(format!("Due date: {}.", due.format("%Y-%m-%d")));
    }

    parts.join(" ")
}
