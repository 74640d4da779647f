//! Generation backends shared by the AI services.
//!
//! Each capability (estimation, summary, parsing) picks a mock or hosted
//! variant once, from [`AiConfig`]. The hosted variants all talk through
//! [`ChatClient`].

pub mod openai;

pub use openai::{extract_json, parse_json_object, ChatClient, ChatCompletion};

use serde::Serialize;
use tasksense_token::CostEstimate;

use crate::config::AiConfig;
use crate::error::{AiError, AiResult, Operation};

/// Text produced by a backend and the tokens it cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub text: String,
    pub tokens_used: i64,
}

/// Which backend the configuration selects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
    pub is_mock: bool,
    pub available: bool,
}

pub fn provider_info(config: &AiConfig) -> ProviderInfo {
    if config.use_mock {
        ProviderInfo {
            provider: "mock".into(),
            model: "mock".into(),
            is_mock: true,
            available: true,
        }
    } else {
        ProviderInfo {
            provider: "openai".into(),
            model: config.model.clone(),
            is_mock: false,
            available: config.has_api_key(),
        }
    }
}

/// Upper-bound cost of sending `prompt` for `operation` with the
/// configured output limit.
pub fn estimate_cost(config: &AiConfig, operation: Operation, prompt: &str) -> AiResult<CostEstimate> {
    let model = if config.use_mock { "mock" } else { config.model.as_str() };
    let max_output = match operation {
        Operation::Estimation => config.estimation_max_tokens,
        Operation::Summary | Operation::Parsing => config.max_tokens,
    };
    tasksense_token::estimate_cost(model, prompt, max_output as usize)
        .map_err(|e| AiError::Internal(format!("token counting failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_info_for_mock_and_hosted() {
        let info = provider_info(&AiConfig::mock());
        assert!(info.is_mock);
        assert_eq!(info.provider, "mock");

        let info = provider_info(&AiConfig::hosted("sk-test", "http://localhost").resolved());
        assert_eq!(info.provider, "openai");
        assert_eq!(info.model, "gpt-3.5-turbo");
        assert!(info.available);
    }

    #[test]
    fn test_mock_cost_is_zero() {
        let cost = estimate_cost(&AiConfig::mock(), Operation::Summary, "hello world").unwrap();
        assert_eq!(cost.estimated_cost_usd, 0.0);
        assert!(cost.input_tokens > 0);
        assert_eq!(cost.max_output_tokens, 500);
    }

    #[test]
    fn test_hosted_estimation_cost_uses_estimation_limit() {
        let config = AiConfig::hosted("sk-test", "http://localhost").resolved();
        let cost = estimate_cost(&config, Operation::Estimation, "estimate this").unwrap();
        assert_eq!(cost.max_output_tokens, 400);
        assert!(cost.estimated_cost_usd > 0.0);
    }
}
