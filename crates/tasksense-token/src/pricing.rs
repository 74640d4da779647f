//! Per-model pricing and prompt cost estimates.

use anyhow::Result;
use serde::Serialize;

use crate::analyzer::count_tokens;

/// USD price per 1,000 tokens for one model.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// Upper-bound cost of sending one prompt.
#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    pub model: String,
    pub input_tokens: usize,
    pub max_output_tokens: usize,
    pub estimated_cost_usd: f64,
    /// False when the model is not in the price table and the
    /// gpt-3.5-turbo rate was used instead.
    pub pricing_known: bool,
}

const FALLBACK: ModelPricing = ModelPricing {
    input_per_1k: 0.0005,
    output_per_1k: 0.0015,
};

/// Look up pricing for a model. Longest matching prefix wins, so dated
/// snapshots (`gpt-4o-2024-08-06`) resolve to their family.
pub fn model_pricing(model: &str) -> Option<ModelPricing> {
    const TABLE: &[(&str, ModelPricing)] = &[
        ("gpt-3.5-turbo", ModelPricing { input_per_1k: 0.0005, output_per_1k: 0.0015 }),
        ("gpt-4", ModelPricing { input_per_1k: 0.03, output_per_1k: 0.06 }),
        ("gpt-4-turbo", ModelPricing { input_per_1k: 0.01, output_per_1k: 0.03 }),
        ("gpt-4o", ModelPricing { input_per_1k: 0.005, output_per_1k: 0.015 }),
        ("gpt-4o-mini", ModelPricing { input_per_1k: 0.00015, output_per_1k: 0.0006 }),
        ("mock", ModelPricing { input_per_1k: 0.0, output_per_1k: 0.0 }),
    ];

    TABLE
        .iter()
        .filter(|(prefix, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, pricing)| *pricing)
}

/// Estimate the cost of `prompt` plus a full `max_output_tokens` completion.
pub fn estimate_cost(model: &str, prompt: &str, max_output_tokens: usize) -> Result<CostEstimate> {
    let input_tokens = count_tokens(prompt)?;
    let pricing = model_pricing(model);
    if pricing.is_none() {
        tracing::debug!(model, "no price listed, using fallback rates");
    }
    let rates = pricing.unwrap_or(FALLBACK);

    let cost = input_tokens as f64 / 1000.0 * rates.input_per_1k
        + max_output_tokens as f64 / 1000.0 * rates.output_per_1k;

    Ok(CostEstimate {
        model: model.to_string(),
        input_tokens,
        max_output_tokens,
        estimated_cost_usd: (cost * 1_000_000.0).round() / 1_000_000.0,
        pricing_known: pricing.is_some(),
    })
}
