//! Parse results and the closed vocabularies they are normalized into.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::task::model::TaskPriority;

/// Priority as extracted from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ParsePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl ParsePriority {
    /// Map a synonym onto the closed set. Unknown words read as medium.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" | "minor" | "trivial" => Self::Low,
            "high" | "important" | "major" => Self::High,
            "urgent" | "critical" | "blocker" | "emergency" => Self::Urgent,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// The task store has no `urgent`; it becomes critical.
    pub fn to_task_priority(self) -> TaskPriority {
        match self {
            Self::Low => TaskPriority::Low,
            Self::Medium => TaskPriority::Medium,
            Self::High => TaskPriority::High,
            Self::Urgent => TaskPriority::Critical,
        }
    }
}

impl fmt::Display for ParsePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    #[default]
    Task,
    Bug,
    Feature,
    Story,
    Epic,
}

impl TaskType {
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "bug" | "issue" | "defect" | "error" | "problem" => Self::Bug,
            "feature" | "enhancement" | "improvement" | "new" => Self::Feature,
            "story" | "user story" => Self::Story,
            "epic" => Self::Epic,
            _ => Self::Task,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Feature => "feature",
            Self::Story => "story",
            Self::Epic => "epic",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured task fields extracted from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub title: String,
    pub description: String,
    pub priority: ParsePriority,
    /// Story points.
    pub estimate: Option<u32>,
    /// ISO date as written by the parser; checked when the task is created.
    pub due_date: Option<String>,
    pub task_type: TaskType,
    pub tags: Vec<String>,
    pub confidence_score: f64,
    pub raw_text: String,
}

impl ParseResult {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority: ParsePriority::Medium,
            estimate: None,
            due_date: None,
            task_type: TaskType::Task,
            tags: Vec::new(),
            confidence_score: 0.0,
            raw_text: String::new(),
        }
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ParseResult: '{}' ({}, {:.2})",
            self.title, self.priority, self.confidence_score
        )
    }
}

/// Advice for writing text that parses well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsingSuggestions {
    pub text_length: usize,
    pub suggestions: Vec<String>,
    pub tips: Vec<String>,
    pub estimated_confidence: f64,
}
