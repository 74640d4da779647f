//! Builders that assemble estimation results.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};

use super::model::{EstimationResult, SimilarTaskScore};
use crate::repository::SimilarTask;
use crate::task::model::{format_estimate, Task, TaskPriority};

const MIN_HOURS: f64 = 0.1;
const MAX_HOURS: f64 = 500.0;
const MAX_SIMILAR_TASKS: usize = 5;

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Accumulates hours, confidence, reasoning sections and metadata, then
/// produces a bounded [`EstimationResult`].
#[derive(Debug, Clone)]
pub struct EstimationResultBuilder {
    hours: f64,
    confidence: f64,
    reasoning: Vec<String>,
    similar_tasks: Vec<SimilarTaskScore>,
    metadata: Map<String, Value>,
}

impl Default for EstimationResultBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimationResultBuilder {
    pub fn new() -> Self {
        Self {
            hours: 0.0,
            confidence: 0.0,
            reasoning: Vec::new(),
            similar_tasks: Vec::new(),
            metadata: Map::new(),
        }
    }

    /// Clamped to [0.1, 500].
    pub fn hours(mut self, hours: f64) -> Self {
        self.hours = hours.clamp(MIN_HOURS, MAX_HOURS);
        self
    }

    /// Clamped to [0, 1].
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// A titled section. Plain titles get an `=` underline; titles that
    /// already contain `=` or `-` are used as they are.
    pub fn section(mut self, title: &str, content: &str) -> Self {
        if !title.is_empty() {
            self.reasoning.push(title.to_string());
            if !title.contains('=') && !title.contains('-') {
                self.reasoning.push("=".repeat(title.chars().count()));
            }
        }
        if !content.is_empty() {
            self.reasoning.push(String::new());
            self.reasoning.push(content.to_string());
        }
        self
    }

    /// Bulleted items.
    pub fn list<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            self.reasoning.push(format!("• {}", item.as_ref()));
        }
        self
    }

    /// Lines appended verbatim.
    pub fn lines<I>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.reasoning.extend(lines);
        self
    }

    /// A paragraph preceded by a blank line.
    pub fn text(mut self, text: &str) -> Self {
        if !text.is_empty() {
            self.reasoning.push(String::new());
            self.reasoning.push(text.to_string());
        }
        self
    }

    /// Keeps the first five.
    pub fn similar_tasks(mut self, mut similar: Vec<SimilarTaskScore>) -> Self {
        similar.truncate(MAX_SIMILAR_TASKS);
        self.similar_tasks = similar;
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn meta(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> EstimationResult {
        let reasoning = if self.reasoning.is_empty() {
            "No reasoning provided".to_string()
        } else {
            self.reasoning.join("\n")
        };

        EstimationResult {
            estimated_hours: round_to(self.hours, 1),
            confidence_score: self.confidence,
            reasoning,
            similar_tasks: self.similar_tasks,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Clone)]
struct TaskAnalysis {
    score: SimilarTaskScore,
    factors: Vec<String>,
}

/// Pairs reference tasks with the per-task analysis a hosted model
/// returned for them.
#[derive(Debug, Clone, Default)]
pub struct SimilarTaskAnalysisBuilder {
    analyses: Vec<TaskAnalysis>,
}

impl SimilarTaskAnalysisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `analysis` is the model's entry for this task, if it produced one.
    pub fn add(mut self, task: &SimilarTask, analysis: Option<&Map<String, Value>>) -> Self {
        let similarity = analysis
            .and_then(|a| a.get("similarity_score"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let factors = analysis
            .and_then(|a| a.get("similarity_factors"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        self.analyses.push(TaskAnalysis {
            score: SimilarTaskScore {
                id: task.id,
                title: task.title.clone(),
                estimate: task.estimate,
                priority: task.priority.clone(),
                similarity_score: round_to(similarity, 2),
            },
            factors,
        });
        self
    }

    pub fn reasoning_lines(&self) -> Vec<String> {
        if self.analyses.is_empty() {
            return vec!["• No similar tasks found".into()];
        }

        let mut lines = Vec::new();
        for analysis in &self.analyses {
            let mut line = format!(
                "• Task #{}: {}h",
                analysis.score.id,
                format_estimate(analysis.score.estimate)
            );
            if analysis.score.similarity_score > 0.0 {
                line.push_str(&format!(" (similarity: {:.2})", analysis.score.similarity_score));
            }
            lines.push(line);

            if !analysis.factors.is_empty() {
                lines.push(format!("  Factors: {}", analysis.factors.join(", ")));
            }
        }
        lines
    }

    pub fn into_scores(self) -> Vec<SimilarTaskScore> {
        self.analyses.into_iter().map(|a| a.score).collect()
    }
}

/// The deterministic heuristic behind the mock estimator.
///
/// Start at 3 hours, scale by title and description length and by
/// priority, blend with the history average, then apply a variance seeded
/// by the task id.
#[derive(Debug, Clone)]
pub struct MockEstimationBuilder<'a> {
    task: &'a Task,
    complexity_factors: Vec<String>,
    base_hours: f64,
    priority_multiplier: f64,
    variance_factor: f64,
}

impl<'a> MockEstimationBuilder<'a> {
    pub fn new(task: &'a Task) -> Self {
        Self {
            task,
            complexity_factors: Vec::new(),
            base_hours: 3.0,
            priority_multiplier: 1.0,
            variance_factor: 1.0,
        }
    }

    pub fn title_complexity(mut self) -> Self {
        let words = self.task.title_word_count();
        if words > 8 {
            self.base_hours *= 1.3;
            self.complexity_factors.push("Complex title".into());
        } else if words < 3 {
            self.base_hours *= 0.8;
            self.complexity_factors.push("Simple title".into());
        }
        self
    }

    pub fn description_complexity(mut self) -> Self {
        if !self.task.description.is_empty() {
            let words = self.task.description_word_count();
            if words > 100 {
                self.base_hours *= 1.5;
                self.complexity_factors.push("Detailed description".into());
            } else if words < 20 {
                self.base_hours *= 0.9;
                self.complexity_factors.push("Brief description".into());
            }
        }
        self
    }

    pub fn priority_impact(mut self) -> Self {
        self.priority_multiplier = priority_multiplier(self.task.priority);
        self.base_hours *= self.priority_multiplier;
        if self.priority_multiplier != 1.0 {
            self.complexity_factors
                .push(format!("{} priority", self.task.priority.as_str()));
        }
        self
    }

    /// 70% history average, 30% heuristic.
    pub fn similar_tasks_influence(mut self, similar: &[SimilarTask]) -> Self {
        if !similar.is_empty() {
            let average = similar.iter().map(|t| t.estimate).sum::<f64>() / similar.len() as f64;
            self.base_hours = average * 0.7 + self.base_hours * 0.3;
            self.complexity_factors
                .push(format!("Based on {} similar tasks", similar.len()));
        }
        self
    }

    pub fn deterministic_variance(mut self) -> Self {
        let mut rng = StdRng::seed_from_u64(self.task.id as u64);
        self.variance_factor = rng.gen_range(0.85..=1.15);
        self
    }

    pub fn estimated_hours(&self) -> f64 {
        self.base_hours * self.variance_factor
    }

    pub fn priority_multiplier(&self) -> f64 {
        self.priority_multiplier
    }

    pub fn variance_factor(&self) -> f64 {
        self.variance_factor
    }

    pub fn complexity_factors(&self) -> &[String] {
        &self.complexity_factors
    }

    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("model".into(), json!("mock-ai-similarity"));
        metadata.insert("tokens_used".into(), json!(0));
        metadata.insert("is_mock".into(), json!(true));
        metadata.insert("complexity_factors".into(), json!(self.complexity_factors));
        metadata.insert("priority_multiplier".into(), json!(self.priority_multiplier));
        metadata.insert("variance_factor".into(), json!(round_to(self.variance_factor, 2)));
        metadata
    }
}

pub fn priority_multiplier(priority: TaskPriority) -> f64 {
    match priority {
        TaskPriority::Low => 0.8,
        TaskPriority::Medium => 1.0,
        TaskPriority::High => 1.2,
        TaskPriority::Critical => 1.4,
    }
}
