//! One streaming session: decodes client frames, runs the requested
//! operation step by step and emits [`SessionEvent`]s.
//!
//! Frames are handled one at a time. Events go to an unbounded channel; if
//! the client is gone the operation still runs to completion and its
//! writes persist.

use serde_json::{json, Map, Value};
use tasksense_core::AiError;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use super::protocol::{
    ClientMessage, ProgressTracker, SessionEvent, CREATE_STEPS, ESTIMATION_STEPS, PARSE_STEPS,
    SUMMARY_STEPS,
};
use crate::state::AppState;

/// What a connection is for, fixed by its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Estimation { task_id: i64 },
    Summary { task_id: i64 },
    Parse,
    Create,
}

impl SessionKind {
    pub fn action(&self) -> &'static str {
        match self {
            Self::Estimation { .. } => "estimate",
            Self::Summary { .. } => "generate_summary",
            Self::Parse => "parse",
            Self::Create => "create",
        }
    }

    /// All sessions are open to anonymous clients.
    pub fn requires_authentication(&self) -> bool {
        false
    }
}

/// How an operation's failures are worded.
struct Failure {
    /// Prefix for errors the client can act on.
    prefix: &'static str,
    /// Whole message for internal errors.
    generic: &'static str,
}

const ESTIMATION_FAILURE: Failure = Failure {
    prefix: "Estimation failed",
    generic: "Failed to estimate task",
};
const SUMMARY_FAILURE: Failure = Failure {
    prefix: "Failed to generate summary",
    generic: "Failed to generate summary",
};
const PARSE_FAILURE: Failure = Failure {
    prefix: "Parsing failed",
    generic: "Failed to parse text",
};
const CREATE_FAILURE: Failure = Failure {
    prefix: "Failed to parse text",
    generic: "Failed to create task",
};

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub struct Session {
    kind: SessionKind,
    state: AppState,
    events: UnboundedSender<SessionEvent>,
}

impl Session {
    pub fn new(kind: SessionKind, state: AppState, events: UnboundedSender<SessionEvent>) -> Self {
        Self {
            kind,
            state,
            events,
        }
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!(kind = ?self.kind, "client gone, event dropped");
        }
    }

    fn emit_all(&self, events: impl IntoIterator<Item = SessionEvent>) {
        for event in events {
            self.emit(event);
        }
    }

    fn step(&self, tracker: &mut ProgressTracker) {
        if let Some(event) = tracker.advance() {
            self.emit(event);
        }
    }

    fn fail(&self, tracker: &mut ProgressTracker, err: AiError, failure: &Failure) {
        let (message, code) = if err.is_not_found() {
            (err.client_message(), "not_found")
        } else if err.operation().is_some() && !err.is_internal() {
            warn!(kind = ?self.kind, error = %err, "operation failed");
            (format!("{}: {}", failure.prefix, err.client_message()), err.code())
        } else {
            error!(kind = ?self.kind, error = ?err, "operation failed unexpectedly");
            (failure.generic.to_string(), "internal_error")
        };
        if let Some(event) = tracker.fail(message, code) {
            self.emit(event);
        }
    }

    /// Greet a newly accepted client.
    pub fn open(&self) {
        info!(kind = ?self.kind, "WebSocket session opened");
        self.emit(SessionEvent::connected());
    }

    /// Handle one inbound text frame to completion.
    pub async fn handle_text(&self, text: &str) {
        debug!(kind = ?self.kind, frame = %text, "received frame");

        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(err) => {
                self.emit(SessionEvent::error(err.message(), None));
                return;
            }
        };

        if message.action != self.kind.action() {
            self.emit(SessionEvent::error(
                format!("Unknown action: {}", message.action),
                None,
            ));
            return;
        }

        match self.kind {
            SessionKind::Estimation { task_id } => {
                if self.task_exists(task_id).await {
                    self.estimate(task_id).await;
                }
            }
            SessionKind::Summary { task_id } => {
                if self.task_exists(task_id).await {
                    self.generate_summary(task_id).await;
                }
            }
            SessionKind::Parse => self.parse(message.text()).await,
            SessionKind::Create => self.create(message.text(), message.reporter_id()).await,
        }
    }

    /// Check the addressed task before any step runs.
    async fn task_exists(&self, task_id: i64) -> bool {
        match self.state.tasks.exists(task_id).await {
            Ok(true) => true,
            Ok(false) => {
                self.emit(SessionEvent::error(
                    format!("Task {} not found", task_id),
                    Some("not_found"),
                ));
                false
            }
            Err(err) => {
                error!(task_id, error = ?err, "task lookup failed");
                self.emit(SessionEvent::error("Internal server error", Some("internal_error")));
                false
            }
        }
    }

    async fn estimate(&self, task_id: i64) {
        let mut tracker = ProgressTracker::new(ESTIMATION_STEPS);

        self.step(&mut tracker);
        if !self.state.estimation.can_estimate(task_id).await {
            if let Some(event) = tracker.fail(
                "Task must have both title and description for accurate estimation",
                "estimation_error",
            ) {
                self.emit(event);
            }
            return;
        }
        self.step(&mut tracker);
        self.step(&mut tracker);
        self.step(&mut tracker);

        match self.state.estimation.estimate_task(task_id).await {
            Ok(result) => self.emit_all(tracker.complete(payload(json!({
                "task_id": task_id,
                "estimation": result,
            })))),
            Err(err) => self.fail(&mut tracker, err, &ESTIMATION_FAILURE),
        }
    }

    async fn generate_summary(&self, task_id: i64) {
        let mut tracker = ProgressTracker::new(SUMMARY_STEPS);
        for _ in SUMMARY_STEPS {
            self.step(&mut tracker);
        }

        match self.state.summaries.create_or_update_summary(task_id).await {
            Ok(summary) => self.emit_all(tracker.complete(payload(json!({
                "task_id": task_id,
                "summary": {
                    "summary_text": summary.summary_text,
                    "created_at": summary.created_at.to_rfc3339(),
                    "updated_at": summary.updated_at.to_rfc3339(),
                    "token_usage": summary.token_usage,
                    "last_activity_processed": summary.last_activity_processed,
                },
            })))),
            Err(err) => self.fail(&mut tracker, err, &SUMMARY_FAILURE),
        }
    }

    async fn parse(&self, text: &str) {
        if text.is_empty() {
            self.emit(SessionEvent::error("Text is required", None));
            return;
        }

        let mut tracker = ProgressTracker::new(PARSE_STEPS);
        self.step(&mut tracker);
        self.step(&mut tracker);

        match self.state.parser.parse_text_to_task_data(text).await {
            Ok(parsed) => self.emit_all(tracker.complete(payload(json!({ "parsed_data": parsed })))),
            Err(err) => self.fail(&mut tracker, err, &PARSE_FAILURE),
        }
    }

    async fn create(&self, text: &str, reporter_id: Option<i64>) {
        if text.is_empty() {
            self.emit(SessionEvent::error("Text is required", None));
            return;
        }

        let mut tracker = ProgressTracker::new(CREATE_STEPS);
        let parser = &self.state.parser;

        self.step(&mut tracker);
        let parsed = match parser.parse_text_to_task_data(text).await {
            Ok(parsed) => parsed,
            Err(err) => return self.fail(&mut tracker, err, &CREATE_FAILURE),
        };

        self.step(&mut tracker);
        let mut task = match parser.create_task_from_parse_result(&parsed, reporter_id).await {
            Ok(task) => task,
            Err(err) => return self.fail(&mut tracker, err, &CREATE_FAILURE),
        };

        self.step(&mut tracker);
        if self.state.estimation.can_estimate(task.id).await {
            let estimated = async {
                let result = self.state.estimation.estimate_task(task.id).await?;
                self.state.tasks.set_estimate(task.id, result.estimated_hours).await
            }
            .await;
            match estimated {
                Ok(updated) => task = updated,
                Err(err) => warn!(task_id = task.id, error = %err, "failed to auto-estimate task"),
            }
        }

        self.emit_all(tracker.complete(payload(json!({
            "task": {
                "id": task.id,
                "title": task.title,
                "description": task.description,
                "priority": task.priority,
                "status": task.status,
                "estimate": task.estimate,
            },
            "parse_result": {
                "confidence_score": parsed.confidence_score,
                "task_type": parsed.task_type,
                "tags": parsed.tags,
            },
        }))));
    }
}
