//! Heuristic quality checks over a stored summary.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::model::TaskSummary;

/// Outcome of [`analyze_quality`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryQuality {
    pub quality_score: u32,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<i64>,
}

/// Score a summary out of 100. A missing summary scores 0.
pub fn analyze_quality(summary: Option<&TaskSummary>, now: DateTime<Utc>) -> SummaryQuality {
    let Some(summary) = summary else {
        return SummaryQuality {
            quality_score: 0,
            issues: vec!["No summary exists".into()],
            summary_length: None,
            token_usage: None,
        };
    };

    let mut score: i32 = 100;
    let mut issues = Vec::new();
    let length = summary.summary_text.chars().count();

    if length < 50 {
        issues.push("Summary too short".to_string());
        score -= 20;
    } else if length > 1000 {
        issues.push("Summary too long".to_string());
        score -= 10;
    }

    let text = summary.summary_text.to_lowercase();
    if !text.contains("status") {
        issues.push("Missing status information".to_string());
        score -= 15;
    }
    if !text.contains("priority") {
        issues.push("Missing priority information".to_string());
        score -= 10;
    }

    if let Some(at) = summary.last_activity_at {
        if now - at > Duration::days(7) {
            issues.push("Summary may be outdated".to_string());
            score -= 15;
        }
    }

    SummaryQuality {
        quality_score: score.max(0) as u32,
        issues,
        summary_length: Some(length),
        token_usage: Some(summary.token_usage),
    }
}

/// Editorial suggestions for a summary.
pub fn suggest_improvements(summary: Option<&TaskSummary>) -> Vec<String> {
    let Some(summary) = summary else {
        return vec!["Create a summary first".into()];
    };

    let mut suggestions = Vec::new();
    let text = summary.summary_text.to_lowercase();

    if summary.summary_text.chars().count() < 100 {
        suggestions.push("Consider adding more detail about task progress".to_string());
    }
    if !text.contains("next") {
        suggestions.push("Include information about next steps".to_string());
    }
    if !text.contains("blocker") && !text.contains("blocked") {
        suggestions.push("Mention any blockers or dependencies".to_string());
    }
    if summary.token_usage > 500 {
        suggestions
            .push("Consider using a more concise summary style to reduce token usage".to_string());
    }

    suggestions
}
