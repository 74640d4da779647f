//! Task domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tasksense_db::queries::activities::ActivityRow;
use tasksense_db::queries::tasks::TaskRow;
use tasksense_db::queries::users::UserRow;

/// A tracked task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Effort estimate; story points when set by hand, hours when set
    /// by the estimator.
    pub estimate: Option<f64>,
    pub assignee_id: Option<i64>,
    pub assignee: Option<String>,
    pub reporter_id: i64,
    pub reporter: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a Task from a database row.
    pub fn from_row(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            status: TaskStatus::from_str(&row.status),
            priority: TaskPriority::from_str(&row.priority),
            estimate: row.estimate,
            assignee_id: row.assignee_id,
            assignee: row.assignee,
            reporter_id: row.reporter_id,
            reporter: row.reporter,
            due_date: row
                .due_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }

    pub fn title_word_count(&self) -> usize {
        self.title.split_whitespace().count()
    }

    pub fn description_word_count(&self) -> usize {
        self.description.split_whitespace().count()
    }
}

/// Parse a stored RFC 3339 timestamp. Unreadable values fall back to the epoch.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Render an estimate without a trailing `.0` for whole numbers.
pub fn format_estimate(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    InReview,
    Done,
    Blocked,
}

impl TaskStatus {
    /// Parse from string. `closed` is read as done; unknown values as todo.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "in_progress" => Self::InProgress,
            "in_review" => Self::InReview,
            "done" | "closed" => Self::Done,
            "blocked" => Self::Blocked,
            _ => Self::Todo,
        }
    }

    /// Strict parse for user input.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "in_review" => Some(Self::InReview),
            "done" => Some(Self::Done),
            "blocked" => Some(Self::Blocked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Done => "done",
            Self::Blocked => "blocked",
        }
    }

    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::InReview => "In Review",
            Self::Done => "Done",
            Self::Blocked => "Blocked",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    /// Parse from string. `urgent` is read as critical; unknown values as medium.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "critical" | "urgent" => Self::Critical,
            _ => Self::Medium,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Kind of activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Created,
    FieldChange,
    Comment,
    Deleted,
}

impl ActivityKind {
    pub fn from_str(s: &str) -> Self {
        match s {
            "created" => Self::Created,
            "field_change" => Self::FieldChange,
            "deleted" => Self::Deleted,
            _ => Self::Comment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::FieldChange => "field_change",
            Self::Comment => "comment",
            Self::Deleted => "deleted",
        }
    }
}

/// One entry of a task's append-only activity log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub id: i64,
    pub task_id: i64,
    pub kind: ActivityKind,
    pub description: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Activity {
    pub fn from_row(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            kind: ActivityKind::from_str(&row.activity_type),
            description: row.description,
            user_id: row.user_id,
            username: row.username,
            timestamp: parse_timestamp(&row.timestamp),
        }
    }
}

/// A user who reports, owns or acts on tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
}

impl User {
    pub fn from_row(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
        }
    }
}

/// Values for a new task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub estimate: Option<f64>,
    pub assignee_id: Option<i64>,
    pub reporter_id: i64,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, description: impl Into<String>, reporter_id: i64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            estimate: None,
            assignee_id: None,
            reporter_id,
            due_date: None,
        }
    }
}

/// Partial update of a task. `None` leaves a field untouched; the nested
/// options clear a nullable field when set to `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub estimate: Option<Option<f64>>,
    pub assignee_id: Option<Option<i64>>,
    pub due_date: Option<Option<NaiveDate>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_aliases() {
        assert_eq!(TaskStatus::from_str("closed"), TaskStatus::Done);
        assert_eq!(TaskStatus::from_str("IN_REVIEW"), TaskStatus::InReview);
        assert_eq!(TaskStatus::from_str("whatever"), TaskStatus::Todo);
        assert_eq!(TaskStatus::parse("closed"), None);
    }

    #[test]
    fn test_priority_aliases() {
        assert_eq!(TaskPriority::from_str("urgent"), TaskPriority::Critical);
        assert_eq!(TaskPriority::from_str("unknown"), TaskPriority::Medium);
        assert_eq!(TaskPriority::High.display_name(), "High");
    }

    #[test]
    fn test_format_estimate() {
        assert_eq!(format_estimate(3.0), "3");
        assert_eq!(format_estimate(2.5), "2.5");
    }

    #[test]
    fn test_parse_timestamp() {
        let at = parse_timestamp("2024-01-02T03:04:05.000006Z");
        assert_eq!(at.timestamp_subsec_micros(), 6);
        assert_eq!(parse_timestamp("garbage").timestamp(), 0);
    }
}
