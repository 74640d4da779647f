use serde_json::{json, Value};
use tasksense_core::task::{self, model::NewTask};
use tasksense_core::AiConfig;
use tasksense_db::DbPool;
use tasksense_web::websocket::{Session, SessionEvent, SessionKind};
use tasksense_web::AppState;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedReceiver};

struct Harness {
    pool: DbPool,
    state: AppState,
    user_id: i64,
}

fn harness() -> Harness {
    let pool = tasksense_db::init_in_memory().unwrap();
    let user = task::create_user(&pool, "alice").unwrap();
    let state = AppState::new(pool.clone(), AiConfig::mock()).unwrap();
    Harness {
        pool,
        state,
        user_id: user.id,
    }
}

fn open(h: &Harness, kind: SessionKind) -> (Session, UnboundedReceiver<SessionEvent>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = Session::new(kind, h.state.clone(), tx);
    assert_eq!(session.kind(), kind);
    session.open();
    assert_eq!(rx.try_recv().unwrap(), SessionEvent::connected());
    (session, rx)
}

fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(serde_json::to_value(event).unwrap());
    }
    events
}

fn progress_values(events: &[Value]) -> Vec<i64> {
    events
        .iter()
        .filter(|e| e["type"] == "progress")
        .map(|e| e["progress"].as_i64().unwrap())
        .collect()
}

fn create_task(h: &Harness, title: &str, description: &str) -> i64 {
    task::create_task(&h.pool, &NewTask::new(title, description, h.user_id))
        .unwrap()
        .id
}

#[tokio::test]
async fn malformed_frames_get_uncoded_errors() {
    let h = harness();
    let (session, mut rx) = open(&h, SessionKind::Parse);

    session.handle_text("not json").await;
    session.handle_text("[1, 2]").await;
    session.handle_text(r#"{"text": "hi"}"#).await;
    session.handle_text(r#"{"action": "estimate"}"#).await;

    let events = drain(&mut rx);
    assert_eq!(
        events,
        vec![
            json!({"type": "error", "message": "Invalid JSON format"}),
            json!({"type": "error", "message": "Message must be a JSON object"}),
            json!({"type": "error", "message": "Message must include 'action' field"}),
            json!({"type": "error", "message": "Unknown action: estimate"}),
        ]
    );
}

#[tokio::test]
async fn estimation_streams_steps_then_success() {
    let h = harness();
    let id = create_task(&h, "Add CSV export", "Let managers download the board as CSV");
    let (session, mut rx) = open(&h, SessionKind::Estimation { task_id: id });

    session.handle_text(r#"{"action": "estimate"}"#).await;
    let events = drain(&mut rx);

    assert_eq!(progress_values(&events), vec![10, 30, 60, 80, 100]);
    assert_eq!(events[0]["step"], "validate");
    assert_eq!(events[4]["step"], "complete");
    let success = events.last().unwrap();
    assert_eq!(success["type"], "success");
    assert_eq!(success["task_id"], id);
    assert!(success["estimation"]["estimated_hours"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn missing_task_fails_before_any_progress() {
    let h = harness();
    let (session, mut rx) = open(&h, SessionKind::Estimation { task_id: 404 });

    session.handle_text(r#"{"action": "estimate"}"#).await;
    assert_eq!(
        drain(&mut rx),
        vec![json!({"type": "error", "message": "Task 404 not found", "code": "not_found"})]
    );
}

#[tokio::test]
async fn unestimable_task_reports_estimation_error() {
    let h = harness();
    let id = create_task(&h, "No details", "");
    let (session, mut rx) = open(&h, SessionKind::Estimation { task_id: id });

    session.handle_text(r#"{"action": "estimate"}"#).await;
    let events = drain(&mut rx);

    assert_eq!(progress_values(&events), vec![10]);
    let last = events.last().unwrap();
    assert_eq!(last["type"], "error");
    assert_eq!(last["code"], "estimation_error");
    assert!(events.iter().all(|e| e["type"] != "success"));
}

#[tokio::test]
async fn summary_session_is_incremental() {
    let h = harness();
    let id = create_task(&h, "Write docs", "API reference");
    let (session, mut rx) = open(&h, SessionKind::Summary { task_id: id });

    session.handle_text(r#"{"action": "generate_summary"}"#).await;
    let first = drain(&mut rx);
    assert_eq!(progress_values(&first), vec![20, 40, 70, 90, 100]);
    let first_summary = first.last().unwrap()["summary"].clone();
    assert!(first_summary["summary_text"].as_str().unwrap().contains("Write docs"));

    // no new activity: same summary, same cost
    session.handle_text(r#"{"action": "generate_summary"}"#).await;
    let second = drain(&mut rx);
    assert_eq!(second.last().unwrap()["summary"], first_summary);

    task::add_comment(&h.pool, id, Some(h.user_id), "Outlined the endpoints").unwrap();
    session.handle_text(r#"{"action": "generate_summary"}"#).await;
    let third = drain(&mut rx);
    let third_summary = &third.last().unwrap()["summary"];
    assert!(
        third_summary["token_usage"].as_i64().unwrap() > first_summary["token_usage"].as_i64().unwrap()
    );
    assert_ne!(third_summary["last_activity_processed"], first_summary["last_activity_processed"]);
}

#[tokio::test]
async fn parse_session() {
    let h = harness();
    let (session, mut rx) = open(&h, SessionKind::Parse);

    session.handle_text(r#"{"action": "parse", "text": "   "}"#).await;
    assert_eq!(
        drain(&mut rx),
        vec![json!({"type": "error", "message": "Text is required"})]
    );

    session.handle_text(r#"{"action": "parse", "text": "fix"}"#).await;
    let events = drain(&mut rx);
    let last = events.last().unwrap();
    assert_eq!(last["code"], "parse_error");
    assert_eq!(
        last["message"],
        "Parsing failed: Validation failed: Text too short - please provide more details"
    );

    session
        .handle_text(r#"{"action": "parse", "text": "urgent: fix crash on login, 3 hours"}"#)
        .await;
    let events = drain(&mut rx);
    assert_eq!(progress_values(&events), vec![30, 70, 100]);
    let parsed = &events.last().unwrap()["parsed_data"];
    assert_eq!(parsed["priority"], "urgent");
    assert_eq!(parsed["task_type"], "bug");
    assert_eq!(parsed["estimate"], 2);
}

#[tokio::test]
async fn create_session_auto_estimates() {
    let h = harness();
    let (session, mut rx) = open(&h, SessionKind::Create);

    session
        .handle_text(r#"{"action": "create", "text": "Add dark mode to the settings page. Users keep asking for it."}"#)
        .await;
    let events = drain(&mut rx);

    assert_eq!(progress_values(&events), vec![20, 50, 80, 100]);
    let success = events.last().unwrap();
    assert_eq!(success["type"], "success");
    assert_eq!(success["task"]["title"], "Add dark mode to the settings page");
    assert_eq!(success["parse_result"]["task_type"], "feature");

    let id = success["task"]["id"].as_i64().unwrap();
    let stored = task::get_task(&h.pool, id).unwrap();
    assert_eq!(stored.reporter_id, h.user_id);
    assert!(stored.estimate.unwrap() > 0.0);
    assert_eq!(success["task"]["estimate"], stored.estimate.unwrap());
}

/// Hosted-provider harness whose endpoint accepts connections and never
/// answers, so every model call hits the 1s request timeout.
async fn stalled_harness() -> Harness {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = AiConfig::hosted("sk-test", format!("http://{}", addr));
    config.request_timeout_secs = 1;
    let pool = tasksense_db::init_in_memory().unwrap();
    let user = task::create_user(&pool, "alice").unwrap();
    let state = AppState::new(pool.clone(), config).unwrap();
    Harness {
        pool,
        state,
        user_id: user.id,
    }
}

#[tokio::test]
async fn provider_timeout_after_last_step_is_generic_internal_error() {
    let h = stalled_harness().await;
    let id = create_task(&h, "Add CSV export", "Let managers download the board as CSV");

    let (session, mut rx) = open(&h, SessionKind::Summary { task_id: id });
    session.handle_text(r#"{"action": "generate_summary"}"#).await;
    let events = drain(&mut rx);
    assert_eq!(progress_values(&events), vec![20, 40, 70, 90]);
    assert_eq!(events.len(), 5);
    assert_eq!(
        events[4],
        json!({"type": "error", "message": "Failed to generate summary", "code": "internal_error"})
    );

    let (session, mut rx) = open(&h, SessionKind::Estimation { task_id: id });
    session.handle_text(r#"{"action": "estimate"}"#).await;
    let events = drain(&mut rx);
    assert_eq!(progress_values(&events), vec![10, 30, 60, 80]);
    assert_eq!(events.len(), 5);
    assert_eq!(
        events[4],
        json!({"type": "error", "message": "Failed to estimate task", "code": "internal_error"})
    );
}
