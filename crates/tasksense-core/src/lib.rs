//! TaskSense Core Library
//!
//! AI orchestration for the task tracker: effort estimation, incremental
//! activity summaries and free-text parsing, each backed by either a
//! deterministic mock or a hosted chat-completion model.

pub mod config;
pub mod error;
pub mod estimation;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod repository;
pub mod summary;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AiConfig;
pub use error::{AiError, AiResult, Operation};
pub use estimation::{EstimationResult, EstimationService};
pub use parser::{ParseResult, ParserService};
pub use repository::{RepositoryFactory, SummaryRepository, TaskRepository};
pub use summary::{SummaryService, TaskSummary};
