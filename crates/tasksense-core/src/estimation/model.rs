//! Estimation result types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one estimation. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimationResult {
    /// Effort in hours, within [0.1, 500], one decimal.
    pub estimated_hours: f64,
    pub confidence_score: f64,
    pub reasoning: String,
    /// At most five reference tasks.
    pub similar_tasks: Vec<SimilarTaskScore>,
    /// Model, token usage, risk factors, assumptions and other details.
    pub metadata: Map<String, Value>,
}

impl std::fmt::Display for EstimationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}h (confidence: {:.2})",
            self.estimated_hours, self.confidence_score
        )
    }
}

/// A historical task as reported in an estimation result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarTaskScore {
    pub id: i64,
    pub title: String,
    pub estimate: f64,
    pub priority: String,
    pub similarity_score: f64,
}

/// Blocking errors and advisory warnings for a request.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Cheap indicators of how involved a task looks.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComplexityIndicators {
    pub title_word_count: usize,
    pub description_word_count: usize,
    pub has_assignee: bool,
    pub has_due_date: bool,
    pub priority_level: String,
    pub estimated_complexity: String,
}

/// What the service can say about a task before estimating it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EstimationMetadata {
    pub task_exists: bool,
    pub can_estimate: bool,
    pub estimator_type: String,
    pub validation_errors: Vec<String>,
    pub validation_warnings: Vec<String>,
    pub similar_tasks_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_indicators: Option<ComplexityIndicators>,
}

/// One member of a batch comparison.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComparedEstimate {
    pub task_id: i64,
    pub estimated_hours: f64,
    pub confidence_score: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfidenceRange {
    pub min: f64,
    pub max: f64,
}

/// Aggregate over the tasks of a batch that could be estimated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EstimationComparison {
    pub tasks: Vec<ComparedEstimate>,
    pub average_hours: f64,
    /// Starts inverted (min 1, max 0) and stays so when nothing succeeded.
    pub confidence_range: ConfidenceRange,
    pub common_factors: Vec<String>,
}
