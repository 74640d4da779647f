//! Route handlers.

pub mod estimation;
pub mod parse;
pub mod provider;
pub mod summary;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tasksense_core::{AiError, Operation};
use tracing::error;

/// An [`AiError`] rendered as `{"error": message}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub AiError);

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            AiError::Validation { operation, .. }
            | AiError::Provider { operation, .. }
            | AiError::InvalidResult { operation, .. } => match operation {
                Operation::Estimation | Operation::Parsing => StatusCode::BAD_REQUEST,
                Operation::Summary => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_internal() {
            error!(error = ?self.0, "request failed");
            self.0.client_message()
        } else {
            self.0.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
