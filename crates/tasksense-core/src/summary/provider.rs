//! Summary backends.

use tracing::info;

use crate::config::AiConfig;
use crate::error::{AiResult, Operation};
use crate::prompt::{SummaryPromptBuilder, SUMMARY_SYSTEM_PROMPT};
use crate::provider::{ChatClient, GenerationResult};
use crate::task::model::{Activity, Task, TaskStatus};

/// The configured summary backend.
pub enum SummaryProvider {
    Mock,
    OpenAi(OpenAiSummaryProvider),
}

impl SummaryProvider {
    pub fn from_config(config: &AiConfig) -> AiResult<Self> {
        if config.use_mock {
            info!("mock summary provider initialized");
            Ok(Self::Mock)
        } else {
            let provider = OpenAiSummaryProvider::new(config)?;
            info!(model = %config.model, "OpenAI summary provider initialized");
            Ok(Self::OpenAi(provider))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::OpenAi(_) => "openai",
        }
    }

    /// Summarize `activities`, folding them into `previous` when updating.
    pub async fn generate(
        &self,
        task: &Task,
        activities: &[Activity],
        previous: Option<&str>,
    ) -> AiResult<GenerationResult> {
        match self {
            Self::Mock => Ok(mock_summary(task, activities, previous)),
            Self::OpenAi(provider) => provider.generate(task, activities, previous).await,
        }
    }
}

/// Deterministic summary built from the task fields. Cost is two tokens
/// per word.
pub fn mock_summary(task: &Task, activities: &[Activity], previous: Option<&str>) -> GenerationResult {
    let mut parts = vec![format!(
        "Task '{}' summary: current status: {}, priority: {}.",
        task.title,
        task.status.display_name().to_lowercase(),
        task.priority.display_name().to_lowercase()
    )];

    if activities.is_empty() {
        parts.push("No recent activities.".into());
    } else {
        parts.push(format!("{} recent activities tracked.", activities.len()));
    }

    match &task.assignee {
        Some(assignee) => parts.push(format!("Assigned to {}.", assignee)),
        None => parts.push("No assignee.".into()),
    }

    if previous.is_some_and(|p| !p.is_empty()) {
        parts.push("Summary updated with new activities.".into());
    } else {
        parts.push("Task created and being tracked in the system.".into());
    }

    let text = parts.join(" ");
    let tokens_used = text.split_whitespace().count() as i64 * 2;
    GenerationResult { text, tokens_used }
}

const BLOCKED_FOCUS: &str = "What is blocking the task and who can unblock it";

fn summary_prompt(task: &Task, activities: &[Activity], previous: Option<&str>) -> String {
    let mut builder = SummaryPromptBuilder::new(task)
        .activities(activities)
        .previous_summary(previous);
    if task.status == TaskStatus::Blocked {
        builder = builder.focus_area(BLOCKED_FOCUS);
    }
    builder.build()
}

/// Chat-completion backed summaries.
pub struct OpenAiSummaryProvider {
    client: ChatClient,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiSummaryProvider {
    pub fn new(config: &AiConfig) -> AiResult<Self> {
        Ok(Self {
            client: ChatClient::from_config(config, Operation::Summary)?,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn generate(
        &self,
        task: &Task,
        activities: &[Activity],
        previous: Option<&str>,
    ) -> AiResult<GenerationResult> {
        let prompt = summary_prompt(task, activities, previous);

        info!(task_id = task.id, activities = activities.len(), "generating summary");
        let completion = self
            .client
            .complete(
                Operation::Summary,
                SUMMARY_SYSTEM_PROMPT,
                &prompt,
                self.max_tokens,
                self.temperature,
            )
            .await?;

        info!(task_id = task.id, tokens = completion.total_tokens, "summary generated");
        Ok(GenerationResult {
            text: completion.text,
            tokens_used: completion.total_tokens,
        })
    }
}
