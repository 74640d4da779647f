//! Centralized error types for the AI layer.

use serde::Serialize;
use tasksense_db::DbError;
use thiserror::Error;

/// The AI operation an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Estimation,
    Summary,
    Parsing,
}

impl Operation {
    /// Error code reported to streaming clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Estimation => "estimation_error",
            Self::Summary => "summary_error",
            Self::Parsing => "parse_error",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Estimation => "estimation",
            Self::Summary => "summary",
            Self::Parsing => "parsing",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for AI operations.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller input is not fit for the operation.
    #[error("{message}")]
    Validation { operation: Operation, message: String },

    /// The backend call failed or returned nothing usable.
    #[error("{operation} provider error: {message}")]
    Provider { operation: Operation, message: String },

    /// The backend answered but the result breaks a post-condition.
    #[error("{operation} result rejected: {message}")]
    InvalidResult { operation: Operation, message: String },

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: Operation, seconds: u64 },

    #[error("Database error: {0}")]
    Database(#[source] DbError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for AI operations.
pub type AiResult<T> = Result<T, AiError>;

impl From<DbError> for AiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => Self::NotFound(what),
            DbError::Conflict(what) => Self::Conflict(what),
            other => Self::Database(other),
        }
    }
}

impl AiError {
    pub fn validation(operation: Operation, msg: impl Into<String>) -> Self {
        Self::Validation {
            operation,
            message: msg.into(),
        }
    }

    pub fn provider(operation: Operation, msg: impl Into<String>) -> Self {
        Self::Provider {
            operation,
            message: msg.into(),
        }
    }

    pub fn invalid_result(operation: Operation, msg: impl Into<String>) -> Self {
        Self::InvalidResult {
            operation,
            message: msg.into(),
        }
    }

    /// The operation this error is attributed to, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Validation { operation, .. }
            | Self::Provider { operation, .. }
            | Self::InvalidResult { operation, .. }
            | Self::Timeout { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TaskNotFound(_) | Self::NotFound(_))
    }

    /// Errors that are not attributable to the caller or the backend.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_)
                | Self::Timeout { .. }
                | Self::Database(_)
                | Self::Json(_)
                | Self::Internal(_)
                | Self::Configuration(_)
        )
    }

    /// Error code for the streaming protocol.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { operation, .. }
            | Self::Provider { operation, .. }
            | Self::InvalidResult { operation, .. } => operation.error_code(),
            Self::TaskNotFound(_) | Self::NotFound(_) => "not_found",
            _ => "internal_error",
        }
    }

    /// Message safe to show a remote client.
    ///
    /// Validation and not-found messages are actionable and pass through.
    /// Backend failures are reduced to their category; internal errors
    /// reveal nothing.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::TaskNotFound(id) => format!("Task {} not found", id),
            Self::NotFound(what) => format!("{} not found", what),
            Self::Provider { operation, .. } => {
                format!("the {} provider could not complete the request", operation)
            }
            Self::InvalidResult { operation, .. } => {
                format!("the {} provider returned an unusable result", operation)
            }
            _ => "Internal server error".to_string(),
        }
    }
}
