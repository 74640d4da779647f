//! Free text to structured task fields.

pub mod mock;
pub mod model;
pub mod openai;

pub use mock::MockTaskParser;
pub use model::{ParsePriority, ParseResult, ParsingSuggestions, TaskType};
pub use openai::OpenAiTaskParser;

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AiConfig;
use crate::error::{AiError, AiResult, Operation};
use crate::estimation::ValidationReport;
use crate::repository::{RepositoryFactory, TaskRepository};
use crate::task::model::{NewTask, Task};

const MIN_TEXT_CHARS: usize = 5;
const MAX_TEXT_CHARS: usize = 2000;

/// Input errors, in reporting order.
fn text_errors(text: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        errors.push("Text cannot be empty".to_string());
    }
    if !text.is_empty() && trimmed.chars().count() < MIN_TEXT_CHARS {
        errors.push("Text too short - please provide more details".to_string());
    }
    if text.chars().count() > MAX_TEXT_CHARS {
        errors.push("Text too long - please keep under 2000 characters".to_string());
    }
    errors
}

/// The configured parsing backend.
pub enum TaskParser {
    Mock(MockTaskParser),
    OpenAi(OpenAiTaskParser),
}

impl TaskParser {
    pub fn from_config(config: &AiConfig) -> AiResult<Self> {
        if config.use_mock {
            info!("mock task parser initialized");
            Ok(Self::Mock(MockTaskParser::new()?))
        } else {
            Ok(Self::OpenAi(OpenAiTaskParser::new(config)?))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::OpenAi(_) => "openai",
        }
    }

    /// Parse `text`. Input limits are enforced here too, so a backend never
    /// sees text the service would have refused.
    pub async fn parse_text(&self, text: &str) -> AiResult<ParseResult> {
        if let Some(first) = text_errors(text).into_iter().next() {
            return Err(AiError::validation(Operation::Parsing, first));
        }
        match self {
            Self::Mock(parser) => Ok(parser.parse(text)),
            Self::OpenAi(parser) => parser.parse(text).await,
        }
    }
}

pub struct ParserService {
    parser: TaskParser,
    tasks: Arc<dyn TaskRepository>,
}

impl ParserService {
    pub fn new(parser: TaskParser, tasks: Arc<dyn TaskRepository>) -> Self {
        info!(parser = parser.name(), "parser service initialized");
        Self { parser, tasks }
    }

    pub fn from_config(config: &AiConfig, repositories: &RepositoryFactory) -> AiResult<Self> {
        Ok(Self::new(
            TaskParser::from_config(config)?,
            repositories.task_repository(),
        ))
    }

    pub fn parser_name(&self) -> &'static str {
        self.parser.name()
    }

    /// Parse free text into task fields.
    pub async fn parse_text_to_task_data(&self, text: &str) -> AiResult<ParseResult> {
        let report = Self::validate_request(text);
        if !report.is_valid() {
            return Err(AiError::validation(
                Operation::Parsing,
                format!("Validation failed: {}", report.errors.join("; ")),
            ));
        }

        let result = self.parser.parse_text(text).await.inspect_err(|e| {
            error!(error = %e, "error parsing text to task data");
        })?;
        let result = Self::enhance(result);

        info!(title = %result.title, confidence = result.confidence_score, "parsed text to task");
        Ok(result)
    }

    pub fn validate_request(text: &str) -> ValidationReport {
        let mut report = ValidationReport {
            errors: text_errors(text),
            warnings: Vec::new(),
        };
        if !text.is_empty() && text.split_whitespace().count() < 3 {
            report
                .warnings
                .push("Very brief text - parsing may be less accurate".to_string());
        }
        report
    }

    fn enhance(mut result: ParseResult) -> ParseResult {
        if result.title.trim().is_empty() {
            result.title = "New Task".to_string();
        }
        if result.description.trim().is_empty() {
            result.description = if result.raw_text.is_empty() {
                "No description provided".to_string()
            } else {
                result.raw_text.clone()
            };
        }
        result
    }

    /// Advisory checks on text before parsing. No backend call.
    pub fn get_parsing_suggestions(text: &str) -> ParsingSuggestions {
        let length = text.chars().count();
        let lower = text.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        let mut suggestions = Vec::new();
        let mut tips = Vec::new();

        if length < 10 {
            suggestions.push("Add more details for better parsing".to_string());
            tips.push("Include what needs to be done and why".to_string());
        }
        if length > 1000 {
            suggestions.push("Consider breaking into multiple tasks".to_string());
            tips.push("Shorter descriptions are easier to parse accurately".to_string());
        }
        if !mentions(&["fix", "add", "create", "implement", "update", "remove", "build"]) {
            suggestions.push("Include action words (fix, add, create, etc.)".to_string());
        }
        if !mentions(&["priority", "urgent", "high", "low", "important"]) {
            tips.push("Mention priority level if important".to_string());
        }
        if !mentions(&["hour", "day", "week", "point"]) {
            tips.push("Include time estimates for better planning".to_string());
        }

        let estimated_confidence = if length >= 20 && mentions(&["fix", "add", "create"]) {
            0.8
        } else if length >= 10 {
            0.6
        } else {
            0.3
        };

        ParsingSuggestions {
            text_length: length,
            suggestions,
            tips,
            estimated_confidence,
        }
    }

    /// Pick the reporter: the requested user if present, else the default
    /// user.
    async fn resolve_reporter(&self, requested: Option<i64>) -> AiResult<i64> {
        if let Some(id) = requested {
            if self.tasks.user_exists(id).await? {
                return Ok(id);
            }
            warn!(reporter_id = id, "reporter not found, using default reporter");
        }
        self.tasks
            .default_reporter()
            .await?
            .ok_or_else(|| AiError::NotFound("Reporter".into()))
    }

    /// Create a task from an already parsed result.
    pub async fn create_task_from_parse_result(
        &self,
        result: &ParseResult,
        reporter_id: Option<i64>,
    ) -> AiResult<Task> {
        let reporter = self.resolve_reporter(reporter_id).await?;

        let mut new = NewTask::new(result.title.clone(), result.description.clone(), reporter);
        new.priority = result.priority.to_task_priority();
        new.estimate = result.estimate.filter(|e| *e > 0).map(f64::from);
        new.due_date = result.due_date.as_deref().and_then(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .inspect_err(|_| warn!(due_date = raw, "invalid due date format, ignoring"))
                .ok()
        });

        let task = self.tasks.create(new).await?;
        info!(task_id = task.id, title = %task.title, "created task from text");
        Ok(task)
    }

    /// Parse `text` and create the task it describes.
    pub async fn create_task_from_text(
        &self,
        text: &str,
        reporter_id: Option<i64>,
    ) -> AiResult<(Task, ParseResult)> {
        let result = self.parse_text_to_task_data(text).await?;
        let task = self
            .create_task_from_parse_result(&result, reporter_id)
            .await
            .inspect_err(|e| error!(error = %e, "error creating task from text"))?;
        Ok((task, result))
    }
}
