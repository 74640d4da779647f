//! Wire format and progress state machine of the streaming sessions.
//!
//! Inbound frames are JSON objects with an `action`. Outbound frames are
//! [`SessionEvent`]s, tagged by `type`.

use serde::Serialize;
use serde_json::{Map, Value};

/// Close code sent when a session requires authentication and the
/// client has none.
pub const AUTH_REQUIRED_CLOSE_CODE: u16 = 4001;

/// One outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Connection {
        status: String,
        message: String,
    },
    Progress {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<String>,
    },
    Success {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl SessionEvent {
    pub fn connected() -> Self {
        Self::Connection {
            status: "connected".into(),
            message: "WebSocket connected successfully".into(),
        }
    }

    pub fn error(message: impl Into<String>, code: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"type":"error","message":"Internal server error","code":"internal_error"}"#.into()
        })
    }
}

/// A declared step of an operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub name: &'static str,
    pub progress: u8,
    pub message: &'static str,
}

const fn step(name: &'static str, progress: u8, message: &'static str) -> Step {
    Step {
        name,
        progress,
        message,
    }
}

pub const ESTIMATION_STEPS: &[Step] = &[
    step("validate", 10, "Validating task data..."),
    step("analyze", 30, "Analyzing task complexity..."),
    step("similar", 60, "Finding similar tasks..."),
    step("calculate", 80, "Calculating estimation..."),
];

pub const SUMMARY_STEPS: &[Step] = &[
    step("load_activities", 20, "Loading task activities..."),
    step("analyze_changes", 40, "Analyzing changes..."),
    step("generate_summary", 70, "Generating summary..."),
    step("format_output", 90, "Formatting output..."),
];

pub const PARSE_STEPS: &[Step] = &[
    step("analyze_text", 30, "Analyzing text..."),
    step("extract_data", 70, "Extracting task information..."),
];

pub const CREATE_STEPS: &[Step] = &[
    step("parse_text", 20, "Parsing task description..."),
    step("create_task", 50, "Creating task..."),
    step("estimate_task", 80, "Estimating task complexity..."),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Idle,
    /// Index of the last step reported.
    InProgress(usize),
    Complete,
    Errored,
}

/// Walks an operation through its declared steps.
///
/// Advancing past the last step is a no-op. Once complete or errored the
/// tracker emits nothing more.
#[derive(Debug)]
pub struct ProgressTracker {
    steps: &'static [Step],
    cursor: usize,
    state: OperationState,
}

impl ProgressTracker {
    pub fn new(steps: &'static [Step]) -> Self {
        Self {
            steps,
            cursor: 0,
            state: OperationState::Idle,
        }
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    fn finished(&self) -> bool {
        matches!(self.state, OperationState::Complete | OperationState::Errored)
    }

    /// Progress event for the next declared step, if any remain.
    pub fn advance(&mut self) -> Option<SessionEvent> {
        if self.finished() {
            return None;
        }
        let step = self.steps.get(self.cursor)?;
        self.state = OperationState::InProgress(self.cursor);
        self.cursor += 1;
        Some(SessionEvent::Progress {
            message: step.message.to_string(),
            progress: Some(step.progress),
            step: Some(step.name.to_string()),
        })
    }

    /// The final progress event and the success event.
    pub fn complete(&mut self, payload: Map<String, Value>) -> Vec<SessionEvent> {
        if self.finished() {
            return Vec::new();
        }
        self.state = OperationState::Complete;
        vec![
            SessionEvent::Progress {
                message: "Operation completed!".into(),
                progress: Some(100),
                step: Some("complete".into()),
            },
            SessionEvent::Success { payload },
        ]
    }

    pub fn fail(&mut self, message: impl Into<String>, code: &str) -> Option<SessionEvent> {
        if self.finished() {
            return None;
        }
        self.state = OperationState::Errored;
        Some(SessionEvent::error(message, Some(code)))
    }
}

/// Inbound frame problems, reported without a code.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameError {
    InvalidJson,
    NotAnObject,
    MissingAction,
}

impl FrameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidJson => "Invalid JSON format",
            Self::NotAnObject => "Message must be a JSON object",
            Self::MissingAction => "Message must include 'action' field",
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMessage {
    pub action: String,
    pub body: Map<String, Value>,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text).map_err(|_| FrameError::InvalidJson)?;
        let Value::Object(body) = value else {
            return Err(FrameError::NotAnObject);
        };
        let action = body
            .get("action")
            .and_then(Value::as_str)
            .filter(|a| !a.is_empty())
            .ok_or(FrameError::MissingAction)?
            .to_string();
        Ok(Self { action, body })
    }

    /// Trimmed `text` field, empty if absent.
    pub fn text(&self) -> &str {
        self.body
            .get("text")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
    }

    pub fn reporter_id(&self) -> Option<i64> {
        self.body.get("reporter_id").and_then(Value::as_i64)
    }
}
