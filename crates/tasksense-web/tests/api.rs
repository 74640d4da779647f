use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tasksense_core::task::{self, model::NewTask};
use tasksense_core::AiConfig;
use tasksense_db::DbPool;
use tasksense_web::{create_router, AppState};
use tower::ServiceExt;

struct Fixture {
    pool: DbPool,
    app: Router,
    user_id: i64,
}

fn fixture() -> Fixture {
    let pool = tasksense_db::init_in_memory().unwrap();
    let user = task::create_user(&pool, "alice").unwrap();
    let state = AppState::new(pool.clone(), AiConfig::mock()).unwrap();
    Fixture {
        pool,
        app: create_router(state),
        user_id: user.id,
    }
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_check() {
    let f = fixture();
    let (status, body) = call(&f.app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn estimate_status_mapping() {
    let f = fixture();
    let good = task::create_task(
        &f.pool,
        &NewTask::new("Add CSV export", "Let managers download the board as CSV", f.user_id),
    )
    .unwrap();
    let blank = task::create_task(&f.pool, &NewTask::new("No details", "", f.user_id)).unwrap();

    let (status, body) = call(&f.app, Method::POST, "/api/tasks/999/estimate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found: 999");

    let uri = format!("/api/tasks/{}/estimate", blank.id);
    let (status, body) = call(&f.app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Task validation failed"));

    let uri = format!("/api/tasks/{}/estimate", good.id);
    let (status, body) = call(&f.app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let hours = body["estimated_hours"].as_f64().unwrap();
    assert!(hours > 0.0 && hours <= 500.0);
    assert!(!body["reasoning"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn estimation_metadata_and_compare() {
    let f = fixture();
    let t = task::create_task(
        &f.pool,
        &NewTask::new("Rotate API keys", "Rotate all partner keys and notify owners", f.user_id),
    )
    .unwrap();

    let uri = format!("/api/tasks/{}/estimation-metadata", t.id);
    let (status, body) = call(&f.app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task_exists"], true);
    assert_eq!(body["estimator_type"], "mock_similarity");

    let (status, body) = call(
        &f.app,
        Method::POST,
        "/api/estimations/compare",
        Some(json!({"task_ids": [t.id, 4040]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn summary_lifecycle() {
    let f = fixture();
    let t = task::create_task(&f.pool, &NewTask::new("Write docs", "API reference", f.user_id)).unwrap();
    let base = format!("/api/tasks/{}/summary", t.id);

    let (status, _) = call(&f.app, Method::GET, &base, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(&f.app, Method::POST, &format!("{}/generate", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("generated successfully"));
    assert!(body["summary"]["summary_text"].as_str().unwrap().contains("Write docs"));

    let (status, body) = call(&f.app, Method::GET, &base, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token_usage"].as_i64().unwrap() > 0);

    let (status, body) = call(&f.app, Method::GET, &format!("{}/quality", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quality"]["quality_score"], 100);
    assert!(body["suggestions"].is_array());

    let (status, _) = call(&f.app, Method::DELETE, &base, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&f.app, Method::DELETE, &base, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_for_missing_task() {
    let f = fixture();
    let (status, body) = call(&f.app, Method::POST, "/api/tasks/31/summary/generate", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found: 31");
}

#[tokio::test]
async fn parse_endpoints() {
    let f = fixture();

    let (status, body) = call(&f.app, Method::POST, "/api/parse", Some(json!({"text": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed: Text cannot be empty");

    let (status, body) = call(
        &f.app,
        Method::POST,
        "/api/parse",
        Some(json!({"text": "urgent: fix crash on login, 3 hours"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["priority"], "urgent");
    assert_eq!(body["task_type"], "bug");
    assert_eq!(body["estimate"], 2);

    let (status, body) = call(
        &f.app,
        Method::POST,
        "/api/parse/suggestions",
        Some(json!({"text": "login"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["estimated_confidence"], 0.3);
}

#[tokio::test]
async fn create_task_from_text() {
    let f = fixture();
    let (status, body) = call(
        &f.app,
        Method::POST,
        "/api/tasks/from-text",
        Some(json!({"text": "Critical: restore nightly backups, 2 days"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["task"]["priority"], "critical");
    assert_eq!(body["task"]["estimate"], 6.0);
    assert_eq!(body["task"]["reporter_id"], f.user_id);
    assert_eq!(body["parse_result"]["priority"], "urgent");
}

#[tokio::test]
async fn provider_info() {
    let f = fixture();
    let (status, body) = call(&f.app, Method::GET, "/api/provider", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "mock");
    assert_eq!(body["is_mock"], true);
}
