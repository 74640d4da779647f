//! Chat-completion backed parsing.

use serde_json::{Map, Value};
use tracing::info;

use super::model::{ParsePriority, ParseResult, TaskType};
use crate::config::AiConfig;
use crate::error::{AiError, AiResult, Operation};
use crate::prompt::{build_parsing_prompt, PARSER_SYSTEM_PROMPT};
use crate::provider::{parse_json_object, ChatClient};

const REQUIRED_FIELDS: [&str; 3] = ["title", "description", "priority"];
const MAX_TITLE_CHARS: usize = 100;

pub struct OpenAiTaskParser {
    client: ChatClient,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiTaskParser {
    pub fn new(config: &AiConfig) -> AiResult<Self> {
        let client = ChatClient::from_config(config, Operation::Parsing)?;
        info!(model = client.model(), "OpenAI task parser initialized");
        Ok(Self {
            client,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub async fn parse(&self, text: &str) -> AiResult<ParseResult> {
        let completion = self
            .client
            .complete(
                Operation::Parsing,
                PARSER_SYSTEM_PROMPT,
                &build_parsing_prompt(text),
                self.max_tokens,
                self.temperature,
            )
            .await?;

        let response = parse_json_object(Operation::Parsing, &completion.text)?;
        for field in REQUIRED_FIELDS {
            if !response.contains_key(field) {
                return Err(AiError::provider(
                    Operation::Parsing,
                    format!("AI response missing required field: {}", field),
                ));
            }
        }

        let result = build_result(text, &response)?;
        info!(title = %result.title, confidence = result.confidence_score, "parsed task text");
        Ok(result)
    }
}

fn text_field(response: &Map<String, Value>, field: &str) -> AiResult<String> {
    response[field].as_str().map(str::to_string).ok_or_else(|| {
        AiError::provider(
            Operation::Parsing,
            format!("AI response field '{}' is not a string", field),
        )
    })
}

/// Whole story points in 1..=21. Unreadable values are dropped.
fn estimate_points(value: Option<&Value>) -> Option<u32> {
    let points = match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }?;
    u32::try_from(points.clamp(1, 21)).ok()
}

fn confidence(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

fn build_result(raw_text: &str, response: &Map<String, Value>) -> AiResult<ParseResult> {
    let title = text_field(response, "title")?;
    let description = text_field(response, "description")?;

    let priority = response["priority"]
        .as_str()
        .map(ParsePriority::normalize)
        .unwrap_or_default();
    let task_type = response
        .get("task_type")
        .and_then(Value::as_str)
        .map(TaskType::normalize)
        .unwrap_or_default();

    let tags = match response.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(ParseResult {
        title: title.chars().take(MAX_TITLE_CHARS).collect(),
        description,
        priority,
        estimate: estimate_points(response.get("estimate")),
        due_date: response
            .get("due_date")
            .and_then(Value::as_str)
            .map(str::to_string),
        task_type,
        tags,
        confidence_score: confidence(response.get("confidence_score")),
        raw_text: raw_text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn completion(content: &str) -> String {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"total_tokens": 90}
        })
        .to_string()
    }

    async fn parse_with(server: &mut Server, content: &str) -> AiResult<ParseResult> {
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("Please parse the following task description".into()))
            .with_status(200)
            .with_body(completion(content))
            .create_async()
            .await;
        let parser = OpenAiTaskParser::new(&AiConfig::hosted("sk-test", server.url())).unwrap();
        parser.parse("Fix the flaky upload test before Friday").await
    }

    #[tokio::test]
    async fn test_normalizes_model_output() {
        let mut server = Server::new_async().await;
        let content = json!({
            "title": "T".repeat(120),
            "description": "Stabilize the upload test",
            "priority": "CRITICAL",
            "estimate": 40,
            "due_date": "2025-05-02",
            "task_type": "defect",
            "tags": ["tests", 7],
            "confidence_score": 1.7
        })
        .to_string();

        let result = parse_with(&mut server, &content).await.unwrap();
        assert_eq!(result.title.chars().count(), 100);
        assert_eq!(result.priority, ParsePriority::Urgent);
        assert_eq!(result.task_type, TaskType::Bug);
        assert_eq!(result.estimate, Some(21));
        assert_eq!(result.due_date.as_deref(), Some("2025-05-02"));
        assert_eq!(result.tags, vec!["tests", "7"]);
        assert_eq!(result.confidence_score, 1.0);
        assert_eq!(result.raw_text, "Fix the flaky upload test before Friday");
    }

    #[tokio::test]
    async fn test_lenient_optional_fields() {
        let mut server = Server::new_async().await;
        let content = "```json\n{\"title\": \"Fix test\", \"description\": \"d\", \"priority\": \"soon\", \
                       \"estimate\": \"lots\", \"tags\": \"tests\", \"confidence_score\": \"high\"}\n```";

        let result = parse_with(&mut server, content).await.unwrap();
        assert_eq!(result.priority, ParsePriority::Medium);
        assert_eq!(result.task_type, TaskType::Task);
        assert_eq!(result.estimate, None);
        assert!(result.tags.is_empty());
        assert_eq!(result.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn test_missing_required_field() {
        let mut server = Server::new_async().await;
        let err = parse_with(&mut server, r#"{"title": "Fix test", "description": "d"}"#)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "parsing provider error: AI response missing required field: priority"
        );
        assert_eq!(err.code(), "parse_error");
    }

    #[tokio::test]
    async fn test_non_json_output() {
        let mut server = Server::new_async().await;
        let err = parse_with(&mut server, "Sure! The title is 'Fix test'.").await.unwrap_err();
        assert!(err.to_string().contains("Invalid JSON response from AI"));
    }

    #[test]
    fn test_estimate_points() {
        assert_eq!(estimate_points(Some(&json!(0))), Some(1));
        assert_eq!(estimate_points(Some(&json!(5.8))), Some(5));
        assert_eq!(estimate_points(Some(&json!("8"))), Some(8));
        assert_eq!(estimate_points(Some(&Value::Null)), None);
        assert_eq!(estimate_points(None), None);
    }
}
