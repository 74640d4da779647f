//! Summary model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasksense_db::queries::summaries::SummaryRow;

use crate::task::model::parse_timestamp;

/// The AI narrative of a task, one per task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSummary {
    pub id: i64,
    pub task_id: i64,
    pub summary_text: String,
    /// High-water mark: the last activity folded into the text.
    pub last_activity_processed: Option<i64>,
    /// Timestamp of the high-water mark activity.
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Cumulative tokens spent on this summary.
    pub token_usage: i64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskSummary {
    pub fn from_row(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            task_id: row.task_id,
            summary_text: row.summary_text,
            last_activity_processed: row.last_activity_id,
            last_activity_at: row.last_activity_timestamp.as_deref().map(parse_timestamp),
            token_usage: row.token_usage,
            version: row.version,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}
