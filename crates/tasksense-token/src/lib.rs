//! # TaskSense Token
//!
//! Token counting and cost estimation for prompts sent to hosted models.

pub mod analyzer;
pub mod pricing;

pub use analyzer::{analyze_text, count_tokens, TokenCount};
pub use pricing::{estimate_cost, model_pricing, CostEstimate, ModelPricing};
