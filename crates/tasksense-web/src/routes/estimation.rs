//! Estimation route handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tasksense_core::estimation::{EstimationComparison, EstimationMetadata};
use tasksense_core::EstimationResult;

use super::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CompareRequest {
    pub task_ids: Vec<i64>,
}

pub async fn estimate_task(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<EstimationResult>> {
    let result = state.estimation.estimate_task(id).await?;
    Ok(Json(result))
}

pub async fn get_metadata(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Json<EstimationMetadata> {
    Json(state.estimation.get_estimation_metadata(id).await)
}

pub async fn compare(
    State(state): State<AppState>,
    Json(req): Json<CompareRequest>,
) -> Json<EstimationComparison> {
    Json(state.estimation.compare_estimations(&req.task_ids).await)
}
