//! Summary route handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tasksense_core::summary::SummaryQuality;
use tasksense_core::{AiError, TaskSummary};

use super::ApiResult;
use crate::state::AppState;

fn missing_summary(task_id: i64) -> AiError {
    AiError::NotFound(format!("Summary for task {}", task_id))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskSummary>> {
    let summary = state
        .summaries
        .get_summary(id)
        .await?
        .ok_or_else(|| missing_summary(id))?;
    Ok(Json(summary))
}

pub async fn generate_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let summary = state.summaries.create_or_update_summary(id).await?;
    Ok(Json(json!({
        "message": "Summary generated successfully",
        "summary": summary,
    })))
}

pub async fn delete_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    if !state.summaries.delete_summary(id).await? {
        return Err(missing_summary(id).into());
    }
    Ok(Json(json!({ "message": "Summary deleted successfully" })))
}

pub async fn quality(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let quality: SummaryQuality = state.summaries.analyze_summary_quality(id).await?;
    let suggestions = state.summaries.suggest_improvements(id).await?;
    Ok(Json(json!({
        "task_id": id,
        "quality": quality,
        "suggestions": suggestions,
    })))
}
