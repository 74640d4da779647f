//! Token counting.
//!
//! Uses tiktoken-rs with the cl100k_base encoding shared by the
//! gpt-3.5/gpt-4 model family.

use anyhow::{Context, Result};
use serde::Serialize;

/// Token count for a piece of prompt text.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCount {
    pub source: String,
    pub tokens: usize,
    pub characters: usize,
    pub lines: usize,
}

/// Analyze a string and count its tokens.
pub fn analyze_text(source: &str, content: &str) -> Result<TokenCount> {
    let tokens = count_tokens(content)?;

    Ok(TokenCount {
        source: source.to_string(),
        tokens,
        characters: content.chars().count(),
        lines: content.lines().count(),
    })
}

/// Count tokens using cl100k_base encoding.
pub fn count_tokens(text: &str) -> Result<usize> {
    let bpe = tiktoken_rs::cl100k_base().context("Failed to load cl100k_base tokenizer")?;

    let tokens = bpe.encode_with_special_tokens(text);
    Ok(tokens.len())
}
