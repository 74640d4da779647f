//! Text parsing route handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tasksense_core::parser::ParsingSuggestions;
use tasksense_core::{ParseResult, ParserService};

use super::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct CreateFromTextRequest {
    pub text: String,
    pub reporter_id: Option<i64>,
}

pub async fn parse_text(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> ApiResult<Json<ParseResult>> {
    Ok(Json(state.parser.parse_text_to_task_data(&req.text).await?))
}

pub async fn suggestions(Json(req): Json<ParseRequest>) -> Json<ParsingSuggestions> {
    Json(ParserService::get_parsing_suggestions(&req.text))
}

pub async fn create_from_text(
    State(state): State<AppState>,
    Json(req): Json<CreateFromTextRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (task, parsed) = state
        .parser
        .create_task_from_text(&req.text, req.reporter_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "task": task, "parse_result": parsed })),
    ))
}
