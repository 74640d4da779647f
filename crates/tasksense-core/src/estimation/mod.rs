//! Effort estimation.
//!
//! [`EstimationService`] validates a task, delegates to the configured
//! [`Estimator`] and rejects results that break the output contract.

pub mod builder;
pub mod estimator;
pub mod model;

pub use builder::{EstimationResultBuilder, MockEstimationBuilder, SimilarTaskAnalysisBuilder};
pub use estimator::{Estimator, MockEstimator, SimilarityEstimator};
pub use model::{
    ComparedEstimate, ComplexityIndicators, ConfidenceRange, EstimationComparison,
    EstimationMetadata, EstimationResult, SimilarTaskScore, ValidationReport,
};

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AiConfig;
use crate::error::{AiError, AiResult, Operation};
use crate::repository::{RepositoryFactory, TaskRepository};
use crate::task::model::{Task, TaskPriority};

/// Estimates above this many hours are logged but accepted.
const SUSPICIOUS_HOURS: f64 = 1000.0;

pub struct EstimationService {
    estimator: Estimator,
    tasks: Arc<dyn TaskRepository>,
}

impl EstimationService {
    pub fn new(estimator: Estimator, tasks: Arc<dyn TaskRepository>) -> Self {
        info!(estimator = estimator.name(), "estimation service initialized");
        Self { estimator, tasks }
    }

    /// Production wiring over the SQLite repositories.
    pub fn from_config(config: &AiConfig, repositories: &RepositoryFactory) -> AiResult<Self> {
        let tasks = repositories.task_repository();
        let estimator = Estimator::from_config(config, tasks.clone())?;
        Ok(Self::new(estimator, tasks))
    }

    pub fn estimator_name(&self) -> &'static str {
        self.estimator.name()
    }

    /// Estimate the effort of a task.
    pub async fn estimate_task(&self, task_id: i64) -> AiResult<EstimationResult> {
        let task = self.tasks.get_by_id(task_id).await?;

        let report = Self::validate_request(&task);
        if !report.is_valid() {
            let err = AiError::validation(
                Operation::Estimation,
                format!("Task validation failed: {}", report.errors.join("; ")),
            );
            error!(task_id, error = %err, "estimation rejected");
            return Err(err);
        }

        let result = self.estimator.estimate(&task).await.inspect_err(|e| {
            error!(task_id, error = %e, "estimation failed");
        })?;
        Self::validate_result(&result)?;

        info!(task_id, hours = result.estimated_hours, "task estimated");
        Ok(result)
    }

    /// Whether the task exists and carries enough information to estimate.
    pub async fn can_estimate(&self, task_id: i64) -> bool {
        let outcome = async {
            if !self.tasks.exists(task_id).await? {
                return Ok(false);
            }
            let task = self.tasks.get_by_id(task_id).await?;
            Ok::<_, AiError>(self.estimator.can_estimate(&task))
        }
        .await;

        outcome.unwrap_or_else(|e| {
            error!(task_id, error = %e, "could not check whether task can be estimated");
            false
        })
    }

    /// Errors block estimation; warnings only lower its expected accuracy.
    pub fn validate_request(task: &Task) -> ValidationReport {
        let mut report = ValidationReport::default();

        if task.title.trim().is_empty() {
            report.errors.push("Task must have a title".into());
        }
        if task.description.trim().is_empty() {
            report.errors.push("Task must have a description".into());
        }

        if !task.description.is_empty() && task.description.chars().count() < 20 {
            report
                .warnings
                .push("Description is very brief - estimation may be less accurate".into());
        }
        if !task.title.is_empty() && task.title_word_count() < 3 {
            report
                .warnings
                .push("Title is very brief - consider adding more detail".into());
        }
        if task.status.is_completed() {
            report.warnings.push("Task is already completed".into());
        }

        report
    }

    fn validate_result(result: &EstimationResult) -> AiResult<()> {
        if result.estimated_hours <= 0.0 {
            return Err(AiError::invalid_result(
                Operation::Estimation,
                "Estimated hours must be positive",
            ));
        }
        if result.estimated_hours > SUSPICIOUS_HOURS {
            warn!(hours = result.estimated_hours, "very high estimation");
        }
        if !(0.0..=1.0).contains(&result.confidence_score) {
            return Err(AiError::invalid_result(
                Operation::Estimation,
                "Confidence score must be between 0 and 1",
            ));
        }
        if result.reasoning.trim().chars().count() < 10 {
            return Err(AiError::invalid_result(
                Operation::Estimation,
                "Estimation must include reasoning",
            ));
        }
        Ok(())
    }

    /// Everything that can be said about a task without estimating it.
    /// Lookup failures are reported inside the metadata.
    pub async fn get_estimation_metadata(&self, task_id: i64) -> EstimationMetadata {
        let mut metadata = EstimationMetadata {
            task_exists: false,
            can_estimate: false,
            estimator_type: self.estimator.name().to_string(),
            validation_errors: Vec::new(),
            validation_warnings: Vec::new(),
            similar_tasks_count: 0,
            complexity_indicators: None,
        };

        if let Err(e) = self.fill_metadata(task_id, &mut metadata).await {
            error!(task_id, error = %e, "could not build estimation metadata");
            metadata
                .validation_errors
                .push(format!("Error analyzing task: {}", e.client_message()));
        }
        metadata
    }

    async fn fill_metadata(&self, task_id: i64, metadata: &mut EstimationMetadata) -> AiResult<()> {
        if !self.tasks.exists(task_id).await? {
            metadata.validation_errors.push("Task does not exist".into());
            return Ok(());
        }

        metadata.task_exists = true;
        let task = self.tasks.get_by_id(task_id).await?;
        metadata.can_estimate = self.estimator.can_estimate(&task);

        let report = Self::validate_request(&task);
        metadata.validation_errors = report.errors;
        metadata.validation_warnings = report.warnings;
        metadata.similar_tasks_count = self.tasks.get_similar_tasks(&task, 100).await?.len();
        metadata.complexity_indicators = Some(complexity_indicators(&task));
        Ok(())
    }

    /// Estimate a batch. Members that cannot be estimated are logged and
    /// left out of the aggregate.
    pub async fn compare_estimations(&self, task_ids: &[i64]) -> EstimationComparison {
        let mut comparison = EstimationComparison {
            tasks: Vec::new(),
            average_hours: 0.0,
            confidence_range: ConfidenceRange { min: 1.0, max: 0.0 },
            common_factors: Vec::new(),
        };

        for &task_id in task_ids {
            if !self.can_estimate(task_id).await {
                continue;
            }
            match self.estimate_task(task_id).await {
                Ok(result) => {
                    let range = &mut comparison.confidence_range;
                    range.min = range.min.min(result.confidence_score);
                    range.max = range.max.max(result.confidence_score);
                    comparison.tasks.push(ComparedEstimate {
                        task_id,
                        estimated_hours: result.estimated_hours,
                        confidence_score: result.confidence_score,
                    });
                }
                Err(e) => {
                    warn!(task_id, error = %e, "failed to estimate task for comparison");
                }
            }
        }

        if !comparison.tasks.is_empty() {
            let total: f64 = comparison.tasks.iter().map(|t| t.estimated_hours).sum();
            comparison.average_hours = total / comparison.tasks.len() as f64;
        }
        comparison
    }
}

/// Word counts, assignment, due date and priority, folded into a
/// low/medium/high rating.
pub fn complexity_indicators(task: &Task) -> ComplexityIndicators {
    let title_word_count = task.title_word_count();
    let description_word_count = task.description_word_count();

    let mut score = 0;
    if title_word_count > 8 {
        score += 1;
    }
    if description_word_count > 100 {
        score += 2;
    }
    if matches!(task.priority, TaskPriority::High | TaskPriority::Critical) {
        score += 1;
    }

    let estimated_complexity = match score {
        s if s >= 3 => "high",
        s if s >= 1 => "medium",
        _ => "low",
    };

    ComplexityIndicators {
        title_word_count,
        description_word_count,
        has_assignee: task.assignee_id.is_some(),
        has_due_date: task.due_date.is_some(),
        priority_level: task.priority.as_str().to_string(),
        estimated_complexity: estimated_complexity.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::model::{NewTask, TaskStatus};
    use crate::task as store;
    use crate::testing::{similar, task, StaticTaskRepository};

    fn service_over(tasks: Vec<Task>) -> EstimationService {
        let repo: Arc<dyn TaskRepository> = Arc::new(StaticTaskRepository::new(tasks, Vec::new()));
        let estimator = Estimator::from_config(&AiConfig::mock(), repo.clone()).unwrap();
        EstimationService::new(estimator, repo)
    }

    #[tokio::test]
    async fn test_missing_task_is_not_found() {
        let service = service_over(Vec::new());
        assert!(matches!(service.estimate_task(5).await, Err(AiError::TaskNotFound(5))));
        assert!(!service.can_estimate(5).await);
    }

    #[tokio::test]
    async fn test_blank_description_cannot_be_estimated() {
        let service = service_over(vec![task(1, "Write docs", "   ", TaskPriority::Low)]);
        assert!(!service.can_estimate(1).await);

        let err = service.estimate_task(1).await.unwrap_err();
        assert_eq!(err.to_string(), "Task validation failed: Task must have a description");
        assert_eq!(err.code(), "estimation_error");
    }

    #[tokio::test]
    async fn test_estimate_within_bounds() {
        let service = service_over(vec![task(
            2,
            "Fix login bug",
            "Users cannot log in after resetting their password on mobile.",
            TaskPriority::High,
        )]);
        let result = service.estimate_task(2).await.unwrap();

        let variance = result.metadata["variance_factor"].as_f64().unwrap();
        assert!((0.85..=1.15).contains(&variance));
        let expected = 3.0 * 0.9 * 1.2 * variance;
        assert!((result.estimated_hours - expected).abs() <= 0.1);
        assert!(result.estimated_hours >= 0.1 && result.estimated_hours <= 500.0);
        assert!((0.0..=1.0).contains(&result.confidence_score));
        assert!(result.similar_tasks.len() <= 5);
    }

    #[test]
    fn test_validation_report_warnings() {
        let mut t = task(1, "Fix", "Tiny", TaskPriority::Low);
        t.status = TaskStatus::Done;
        let report = EstimationService::validate_request(&t);
        assert!(report.is_valid());
        assert_eq!(
            report.warnings,
            vec![
                "Description is very brief - estimation may be less accurate",
                "Title is very brief - consider adding more detail",
                "Task is already completed",
            ]
        );
    }

    #[test]
    fn test_result_validation() {
        let mut result = EstimationResultBuilder::new()
            .hours(2.0)
            .confidence(0.5)
            .text("Plenty of reasoning here")
            .build();
        assert!(EstimationService::validate_result(&result).is_ok());

        result.confidence_score = 1.5;
        let err = EstimationService::validate_result(&result).unwrap_err();
        assert!(matches!(err, AiError::InvalidResult { .. }));

        result.confidence_score = 0.5;
        result.reasoning = "short".into();
        assert!(EstimationService::validate_result(&result).is_err());

        result.reasoning = "Long enough reasoning".into();
        result.estimated_hours = 0.0;
        assert!(EstimationService::validate_result(&result).is_err());
    }

    #[test]
    fn test_complexity_rating() {
        let long_description = "word ".repeat(120);
        let t = task(1, "one two three four five six seven eight nine", &long_description, TaskPriority::Critical);
        let indicators = complexity_indicators(&t);
        assert_eq!(indicators.title_word_count, 9);
        assert_eq!(indicators.estimated_complexity, "high");
        assert_eq!(indicators.priority_level, "critical");

        let t = task(1, "Short", "Small", TaskPriority::Medium);
        assert_eq!(complexity_indicators(&t).estimated_complexity, "low");
        let t = task(1, "Short", "Small", TaskPriority::High);
        assert_eq!(complexity_indicators(&t).estimated_complexity, "medium");
    }

    #[tokio::test]
    async fn test_metadata_for_missing_and_existing_task() {
        let repo: Arc<dyn TaskRepository> = Arc::new(StaticTaskRepository::new(
            vec![task(1, "Migrate the billing tables", "Move billing to the new schema", TaskPriority::Medium)],
            vec![similar(7, 3.0), similar(8, 5.0)],
        ));
        let estimator = Estimator::from_config(&AiConfig::mock(), repo.clone()).unwrap();
        let service = EstimationService::new(estimator, repo);

        let missing = service.get_estimation_metadata(99).await;
        assert!(!missing.task_exists);
        assert_eq!(missing.validation_errors, vec!["Task does not exist"]);
        assert!(missing.complexity_indicators.is_none());

        let found = service.get_estimation_metadata(1).await;
        assert!(found.task_exists && found.can_estimate);
        assert_eq!(found.estimator_type, "mock_similarity");
        assert_eq!(found.similar_tasks_count, 2);
        assert_eq!(found.complexity_indicators.unwrap().estimated_complexity, "low");
    }

    #[tokio::test]
    async fn test_compare_skips_failures() {
        let pool = tasksense_db::init_in_memory().unwrap();
        let user = store::create_user(&pool, "alice").unwrap();
        let good = store::create_task(
            &pool,
            &NewTask::new("Add CSV export", "Let users export their board as CSV", user.id),
        )
        .unwrap();
        let blank = store::create_task(&pool, &NewTask::new("No details", "", user.id)).unwrap();

        let service = EstimationService::from_config(&AiConfig::mock(), &RepositoryFactory::new(pool)).unwrap();
        let comparison = service.compare_estimations(&[good.id, blank.id, 404]).await;

        assert_eq!(comparison.tasks.len(), 1);
        assert_eq!(comparison.tasks[0].task_id, good.id);
        assert_eq!(comparison.average_hours, comparison.tasks[0].estimated_hours);
        assert_eq!(comparison.confidence_range.min, comparison.tasks[0].confidence_score);
        assert!(comparison.common_factors.is_empty());

        let empty = service.compare_estimations(&[]).await;
        assert_eq!(empty.average_hours, 0.0);
        assert_eq!(empty.confidence_range, ConfidenceRange { min: 1.0, max: 0.0 });
    }
}
