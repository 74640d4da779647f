//! Estimator backends: a deterministic heuristic and a hosted model that
//! reasons over similar completed tasks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

use super::builder::{round_to, EstimationResultBuilder, MockEstimationBuilder, SimilarTaskAnalysisBuilder};
use super::model::{EstimationResult, SimilarTaskScore};
use crate::config::AiConfig;
use crate::error::{AiError, AiResult, Operation};
use crate::prompt::{estimation_system_prompt, EstimationPromptBuilder};
use crate::provider::{parse_json_object, ChatClient};
use crate::repository::{SimilarTask, TaskRepository};
use crate::task::model::{format_estimate, Task};

/// History handed to the hosted model.
const SIMILARITY_HISTORY: usize = 15;
/// History used by the heuristic.
const MOCK_HISTORY: usize = 5;
/// Similar tasks reported by the heuristic.
const MOCK_REPORTED: usize = 3;

const NO_HISTORY_INSTRUCTION: &str =
    "No comparable completed tasks are on record, so keep the confidence score at or below 0.5.";

/// The configured estimator.
pub enum Estimator {
    Mock(MockEstimator),
    Similarity(SimilarityEstimator),
}

impl Estimator {
    /// Pick the backend the configuration asks for.
    pub fn from_config(config: &AiConfig, tasks: Arc<dyn TaskRepository>) -> AiResult<Self> {
        if config.use_mock {
            info!("mock similarity estimator initialized");
            Ok(Self::Mock(MockEstimator::new(tasks)))
        } else {
            let estimator = SimilarityEstimator::new(config, tasks)?;
            info!(model = %config.model, "AI similarity estimator initialized");
            Ok(Self::Similarity(estimator))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock_similarity",
            Self::Similarity(_) => "ai_similarity",
        }
    }

    /// Minimum information an estimate needs.
    pub fn validate(task: &Task) -> AiResult<()> {
        if task.title.trim().is_empty() {
            return Err(AiError::validation(Operation::Estimation, "Task must have a title"));
        }
        if task.description.trim().is_empty() {
            return Err(AiError::validation(
                Operation::Estimation,
                "Task must have a description for accurate estimation",
            ));
        }
        Ok(())
    }

    pub fn can_estimate(&self, task: &Task) -> bool {
        Self::validate(task).is_ok()
    }

    pub async fn estimate(&self, task: &Task) -> AiResult<EstimationResult> {
        Self::validate(task)?;
        match self {
            Self::Mock(estimator) => estimator.estimate(task).await,
            Self::Similarity(estimator) => estimator.estimate(task).await,
        }
    }
}

/// Deterministic heuristic estimator.
pub struct MockEstimator {
    tasks: Arc<dyn TaskRepository>,
}

impl MockEstimator {
    pub fn new(tasks: Arc<dyn TaskRepository>) -> Self {
        Self { tasks }
    }

    async fn estimate(&self, task: &Task) -> AiResult<EstimationResult> {
        let similar = self.tasks.get_similar_tasks(task, MOCK_HISTORY).await?;

        let builder = MockEstimationBuilder::new(task)
            .title_complexity()
            .description_complexity()
            .priority_impact()
            .similar_tasks_influence(&similar)
            .deterministic_variance();

        let hours = builder.estimated_hours();
        let confidence = mock_confidence(task, similar.len());
        let reported = mock_similar_scores(&similar, task.id);

        let analysis = vec![
            format!("Title complexity: {} words", task.title_word_count()),
            format!("Description length: {} words", task.description_word_count()),
            format!(
                "Priority: {} (×{:?})",
                task.priority.as_str(),
                builder.priority_multiplier()
            ),
        ];

        let factors: Vec<String> = if builder.complexity_factors().is_empty() {
            vec!["Standard complexity".into()]
        } else {
            builder.complexity_factors().to_vec()
        };

        let similar_lines: Vec<String> = if reported.is_empty() {
            vec!["No similar tasks found".into()]
        } else {
            reported
                .iter()
                .map(|s| {
                    format!(
                        "Task #{}: {}h (similarity: {:.2})",
                        s.id,
                        format_estimate(s.estimate),
                        s.similarity_score
                    )
                })
                .collect()
        };

        let calculation = vec![
            format!("Base estimate: {:.1}h", hours / builder.variance_factor()),
            format!("Adjusted for complexity: {:.1}h", hours),
            format!("Confidence: {:.2}", confidence),
        ];

        let mut metadata = builder.metadata();
        metadata.insert("historical_tasks_count".into(), json!(similar.len()));

        let result = EstimationResultBuilder::new()
            .hours(hours)
            .confidence(confidence)
            .section("Mock AI Similarity-Based Estimation", "")
            .section("Task Analysis", "")
            .list(analysis)
            .section("Complexity Factors", "")
            .list(factors)
            .section("Similar Tasks Analysis", "")
            .list(similar_lines)
            .section("Estimation Calculation", "")
            .list(calculation)
            .text("\nNote: This is a mock estimation for development purposes.")
            .similar_tasks(reported)
            .metadata(metadata)
            .build();

        info!(task_id = task.id, hours = result.estimated_hours, "mock estimation completed");
        Ok(result)
    }
}

/// 0.75, plus up to 0.15 for history, plus 0.05 for a description over 50
/// characters; never above 0.9.
pub fn mock_confidence(task: &Task, similar_count: usize) -> f64 {
    let mut confidence = 0.75;
    if similar_count > 0 {
        confidence += (similar_count as f64 * 0.03).min(0.15);
    }
    if task.description.chars().count() > 50 {
        confidence += 0.05;
    }
    confidence.min(0.9)
}

/// Similarity scores for the first three history entries, seeded by the
/// task id.
pub fn mock_similar_scores(similar: &[SimilarTask], seed: i64) -> Vec<SimilarTaskScore> {
    let mut rng = StdRng::seed_from_u64(seed as u64);
    similar
        .iter()
        .take(MOCK_REPORTED)
        .enumerate()
        .map(|(i, s)| {
            let score = 0.9 - i as f64 * 0.1 + rng.gen_range(-0.1..=0.1);
            SimilarTaskScore {
                id: s.id,
                title: s.title.clone(),
                estimate: s.estimate,
                priority: s.priority.clone(),
                similarity_score: round_to(score.clamp(0.3, 0.95), 2),
            }
        })
        .collect()
}

fn estimation_prompt(task: &Task, similar: &[SimilarTask]) -> String {
    let mut builder = EstimationPromptBuilder::new(task).similar_tasks(similar);
    if similar.is_empty() {
        builder = builder.instruction(NO_HISTORY_INSTRUCTION);
    }
    builder.build()
}

/// Hosted-model estimator that reasons over similar completed tasks.
pub struct SimilarityEstimator {
    tasks: Arc<dyn TaskRepository>,
    client: ChatClient,
    max_tokens: u32,
    temperature: f64,
}

impl SimilarityEstimator {
    pub fn new(config: &AiConfig, tasks: Arc<dyn TaskRepository>) -> AiResult<Self> {
        Ok(Self {
            tasks,
            client: ChatClient::from_config(config, Operation::Estimation)?,
            max_tokens: config.estimation_max_tokens,
            temperature: config.estimation_temperature,
        })
    }

    async fn estimate(&self, task: &Task) -> AiResult<EstimationResult> {
        let similar = self.tasks.get_similar_tasks(task, SIMILARITY_HISTORY).await?;
        let prompt = estimation_prompt(task, &similar);

        info!(task_id = task.id, history = similar.len(), "requesting AI similarity estimation");
        let completion = self
            .client
            .complete(
                Operation::Estimation,
                &estimation_system_prompt(),
                &prompt,
                self.max_tokens,
                self.temperature,
            )
            .await?;

        let response = parse_json_object(Operation::Estimation, &completion.text)?;
        for field in ["estimated_hours", "confidence_score", "reasoning"] {
            if !response.contains_key(field) {
                return Err(AiError::provider(
                    Operation::Estimation,
                    format!("AI response missing required field: {}", field),
                ));
            }
        }

        let result = self.build_result(&similar, &response, completion.total_tokens)?;
        info!(
            task_id = task.id,
            hours = result.estimated_hours,
            confidence = result.confidence_score,
            tokens = completion.total_tokens,
            "AI similarity estimation completed"
        );
        Ok(result)
    }

    fn build_result(
        &self,
        similar: &[SimilarTask],
        response: &Map<String, Value>,
        tokens_used: i64,
    ) -> AiResult<EstimationResult> {
        let hours = number_field(response, "estimated_hours")?;
        let confidence = number_field(response, "confidence_score")?;
        let reasoning = match &response["reasoning"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let risk_factors = string_list(response.get("risk_factors"));
        let assumptions = string_list(response.get("assumptions"));
        let task_analysis = response
            .get("similar_task_analysis")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut analysis = SimilarTaskAnalysisBuilder::new();
        for entry in similar.iter().take(5) {
            let matching = task_analysis
                .iter()
                .filter_map(Value::as_object)
                .find(|a| a.get("task_id").and_then(Value::as_i64) == Some(entry.id));
            analysis = analysis.add(entry, matching);
        }

        let mut builder = EstimationResultBuilder::new()
            .hours(hours)
            .confidence(confidence)
            .section("AI Similarity-Based Estimation", &reasoning);

        if !similar.is_empty() {
            builder = builder
                .section("Similar Task Analysis", "")
                .lines(analysis.reasoning_lines());
        }
        if !risk_factors.is_empty() {
            builder = builder.section("Risk Factors", "").list(&risk_factors);
        }
        if !assumptions.is_empty() {
            builder = builder.section("Assumptions", "").list(&assumptions);
        }

        let mut metadata = Map::new();
        metadata.insert("model".into(), json!(self.client.model()));
        metadata.insert("tokens_used".into(), json!(tokens_used));
        metadata.insert("temperature".into(), json!(self.temperature));
        metadata.insert("historical_tasks_count".into(), json!(similar.len()));
        metadata.insert("risk_factors".into(), json!(risk_factors));
        metadata.insert("assumptions".into(), json!(assumptions));
        metadata.insert("similar_task_analysis".into(), Value::Array(task_analysis));

        Ok(builder
            .text(&format!("\nModel: {}", self.client.model()))
            .text(&format!("Temperature: {}", self.temperature))
            .text(&format!("Historical tasks analyzed: {}", similar.len()))
            .similar_tasks(analysis.into_scores())
            .metadata(metadata)
            .build())
    }
}

/// A numeric field, also accepted as a numeric string.
fn number_field(response: &Map<String, Value>, field: &str) -> AiResult<f64> {
    let value = &response[field];
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| {
            AiError::provider(
                Operation::Estimation,
                format!("AI response field '{}' is not a number", field),
            )
        })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}
