//! Keyword and pattern based parsing, no model involved.

use regex::Regex;
use tracing::info;

use super::model::{ParsePriority, ParseResult, TaskType};
use crate::error::{AiError, AiResult};
use crate::estimation::builder::round_to;

const MAX_POINTS: u64 = 21;
const MAX_TAGS: usize = 5;

const ACTION_WORDS: [&str; 7] = ["fix", "add", "create", "implement", "update", "remove", "build"];

/// Deterministic parser over fixed keyword and regex tables.
pub struct MockTaskParser {
    hour_patterns: Vec<Regex>,
    day_patterns: Vec<Regex>,
    point_patterns: Vec<Regex>,
    due_patterns: Vec<Regex>,
    hashtag: Regex,
    sentence_end: Regex,
    whitespace: Regex,
}

fn compile(patterns: &[&str]) -> AiResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| AiError::Internal(format!("bad pattern {}: {}", p, e))))
        .collect()
}

/// First captured number; a digit run too long for `u64` saturates.
fn first_number(patterns: &[Regex], text: &str) -> Option<u64> {
    let captures = patterns.iter().find_map(|p| p.captures(text))?;
    let digits = &captures[1];
    match digits.parse() {
        Ok(n) => Some(n),
        Err(_) if digits.bytes().all(|b| b.is_ascii_digit()) => Some(u64::MAX),
        Err(_) => None,
    }
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// `text` minus a case-insensitive `prefix`, if it starts with one.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for p in prefix.chars() {
        let (_, c) = chars.next()?;
        if !c.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    Some(match chars.next() {
        Some((idx, _)) => &text[idx..],
        None => "",
    })
}

impl MockTaskParser {
    pub fn new() -> AiResult<Self> {
        let single = |p: &str| {
            Regex::new(p).map_err(|e| AiError::Internal(format!("bad pattern {}: {}", p, e)))
        };

        Ok(Self {
            hour_patterns: compile(&[r"(\d+)\s*hours?", r"(\d+)\s*hrs?", r"(\d+)\s*h\b"])?,
            day_patterns: compile(&[r"(\d+)\s*days?", r"(\d+)\s*d\b"])?,
            point_patterns: compile(&[r"(\d+)\s*story points?", r"(\d+)\s*points?", r"(\d+)\s*sp\b"])?,
            due_patterns: compile(&[
                r"due\s+(\d{4}-\d{2}-\d{2})",
                r"by\s+(\d{4}-\d{2}-\d{2})",
                r"deadline\s+(\d{4}-\d{2}-\d{2})",
            ])?,
            hashtag: single(r"#(\w+)")?,
            sentence_end: single(r"[.!?]")?,
            whitespace: single(r"\s+")?,
        })
    }

    pub fn parse(&self, text: &str) -> ParseResult {
        let lower = text.to_lowercase();
        let title = self.extract_title(text);
        let description = Self::describe(text, &title);

        let result = ParseResult {
            priority: Self::extract_priority(&lower),
            estimate: self.extract_estimate(&lower),
            due_date: self.extract_due_date(&lower),
            task_type: Self::extract_task_type(&lower),
            tags: self.extract_tags(text, &lower),
            confidence_score: Self::confidence(text, &lower),
            raw_text: text.to_string(),
            title,
            description,
        };

        info!(title = %result.title, confidence = result.confidence_score, "mock parsed task");
        result
    }

    /// First sentence, whitespace collapsed, at most 100 characters.
    fn extract_title(&self, text: &str) -> String {
        let first = self
            .sentence_end
            .split(text.trim())
            .next()
            .unwrap_or_default()
            .trim();

        let title = if first.chars().count() > 100 {
            format!("{}...", first.chars().take(97).collect::<String>())
        } else {
            first.to_string()
        };

        let title = self.whitespace.replace_all(&title, " ").trim().to_string();
        if title.is_empty() {
            "New Task".to_string()
        } else {
            title
        }
    }

    fn extract_priority(lower: &str) -> ParsePriority {
        if contains_any(lower, &["urgent", "critical", "asap", "emergency", "blocker"]) {
            ParsePriority::Urgent
        } else if contains_any(lower, &["high priority", "important", "major"]) {
            ParsePriority::High
        } else if contains_any(lower, &["low priority", "minor", "trivial", "when time permits"]) {
            ParsePriority::Low
        } else {
            ParsePriority::Medium
        }
    }

    /// Story points from hours (banded), days (three per day) or explicit
    /// points, in that order of preference.
    fn extract_estimate(&self, lower: &str) -> Option<u32> {
        let points = if let Some(hours) = first_number(&self.hour_patterns, lower) {
            match hours {
                0..=2 => 1,
                3..=6 => 2,
                7..=16 => 3,
                17..=40 => 5,
                _ => 8,
            }
        } else if let Some(days) = first_number(&self.day_patterns, lower) {
            days.saturating_mul(3).min(MAX_POINTS)
        } else {
            first_number(&self.point_patterns, lower)?.min(MAX_POINTS)
        };
        u32::try_from(points).ok()
    }

    fn extract_task_type(lower: &str) -> TaskType {
        if contains_any(lower, &["bug", "issue", "error", "broken", "fix", "defect"]) {
            TaskType::Bug
        } else if contains_any(lower, &["feature", "add", "new", "implement", "create", "build"]) {
            TaskType::Feature
        } else if contains_any(lower, &["user story", "story", "as a user"]) {
            TaskType::Story
        } else {
            TaskType::Task
        }
    }

    fn extract_due_date(&self, lower: &str) -> Option<String> {
        self.due_patterns
            .iter()
            .find_map(|p| p.captures(lower))
            .map(|c| c[1].to_string())
    }

    /// Hashtags first, then area keywords. Duplicates dropped, at most five.
    fn extract_tags(&self, text: &str, lower: &str) -> Vec<String> {
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has_word = |w: &str| words.contains(&w);

        let mut candidates: Vec<String> = self
            .hashtag
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect();

        if lower.contains("frontend") || has_word("ui") {
            candidates.push("frontend".into());
        }
        if lower.contains("backend") || has_word("api") {
            candidates.push("backend".into());
        }
        if lower.contains("database") || has_word("db") {
            candidates.push("database".into());
        }
        if lower.contains("security") {
            candidates.push("security".into());
        }
        if lower.contains("performance") {
            candidates.push("performance".into());
        }

        let mut tags = Vec::new();
        for tag in candidates {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags.truncate(MAX_TAGS);
        tags
    }

    fn describe(text: &str, title: &str) -> String {
        let length = text.chars().count();

        if text.trim() == title.trim() || length <= title.chars().count() + 10 {
            return format!("Task to {}", text.to_lowercase());
        }

        if length <= 200 {
            return match strip_prefix_ignore_case(text, title) {
                Some(rest) => {
                    let rest = rest.trim();
                    let rest = rest
                        .strip_prefix(['.', ',', ':', ';'])
                        .map(str::trim)
                        .unwrap_or(rest);
                    if rest.is_empty() {
                        format!("Task to {}", title.to_lowercase())
                    } else {
                        rest.to_string()
                    }
                }
                None => text.to_string(),
            };
        }

        format!("Details:\n{}", text)
    }

    fn confidence(text: &str, lower: &str) -> f64 {
        let mut confidence: f64 = 0.5;

        if (20..=500).contains(&text.chars().count()) {
            confidence += 0.2;
        }
        if text.contains(['.', '!', '?']) {
            confidence += 0.1;
        }
        if contains_any(lower, &ACTION_WORDS) {
            confidence += 0.1;
        }
        if contains_any(lower, &["urgent", "high", "low", "priority"]) {
            confidence += 0.1;
        }

        round_to(confidence.min(1.0), 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> MockTaskParser {
        MockTaskParser::new().unwrap()
    }

    #[test]
    fn test_urgent_crash_report() {
        let result = parser().parse("urgent: fix crash on login, 3 hours");
        assert_eq!(result.priority, ParsePriority::Urgent);
        assert_eq!(result.task_type, TaskType::Bug);
        assert_eq!(result.estimate, Some(2));
        assert_eq!(result.title, "urgent: fix crash on login, 3 hours");
        assert_eq!(result.description, "Task to urgent: fix crash on login, 3 hours");
        assert_eq!(result.confidence_score, 0.9);
        assert_eq!(result.raw_text, "urgent: fix crash on login, 3 hours");
    }

    #[test]
    fn test_title_is_first_sentence() {
        let result = parser().parse("Add CSV export.  The board needs a download button for managers.");
        assert_eq!(result.title, "Add CSV export");
        assert_eq!(result.description, "The board needs a download button for managers.");
        assert_eq!(result.task_type, TaskType::Feature);
    }

    #[test]
    fn test_long_title_truncated() {
        let text = "word ".repeat(40);
        let title = parser().parse(&text).title;
        assert_eq!(title.chars().count(), 100);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn test_estimate_sources() {
        let p = parser();
        assert_eq!(p.parse("Refactor settings page in 20 hrs").estimate, Some(5));
        assert_eq!(p.parse("Migrate the reports, 2 days of work").estimate, Some(6));
        assert_eq!(p.parse("Migrate everything, 30 days of work").estimate, Some(21));
        assert_eq!(p.parse("Tidy the changelog, 3 story points").estimate, Some(3));
        assert_eq!(p.parse("Tidy the changelog someday").estimate, None);
    }

    #[test]
    fn test_due_date_and_tags() {
        let result = parser().parse("Harden the API #security #auth due 2025-06-30 for database access");
        assert_eq!(result.due_date.as_deref(), Some("2025-06-30"));
        assert_eq!(result.tags, vec!["security", "auth", "backend", "database"]);
    }

    #[test]
    fn test_priority_keywords() {
        let p = parser();
        assert_eq!(p.parse("This is important work to do").priority, ParsePriority::High);
        assert_eq!(p.parse("Minor cleanup of the readme").priority, ParsePriority::Low);
        assert_eq!(p.parse("Rename the settings module").priority, ParsePriority::Medium);
    }

    #[test]
    fn test_long_text_gets_details_block() {
        let text = format!("Rework onboarding. {}", "More context here. ".repeat(12));
        let result = parser().parse(&text);
        assert!(result.description.starts_with("Details:\n"));
    }

    #[test]
    fn test_huge_numbers_saturate() {
        let p = parser();
        assert_eq!(p.parse("Load test the API, 99999999999999999999 hours").estimate, Some(8));
        assert_eq!(p.parse("Port the legacy importer, 99999999999999999999 days").estimate, Some(21));
        assert_eq!(p.parse("Tidy the backlog, 99999999999999999999 points").estimate, Some(21));
    }

    #[test]
    fn test_strip_prefix_ignore_case() {
        assert_eq!(strip_prefix_ignore_case("Fix Login. now", "fix login"), Some(". now"));
        assert_eq!(strip_prefix_ignore_case("Fix", "fix login"), None);
        assert_eq!(strip_prefix_ignore_case("abc", "abc"), Some(""));
    }
}
