//! TaskSense Web Server
//!
//! Axum server exposing the AI services as JSON endpoints and as
//! progress-streaming WebSocket sessions.

pub mod routes;
pub mod state;
pub mod websocket;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Estimation
        .route("/tasks/{id}/estimate", post(routes::estimation::estimate_task))
        .route("/tasks/{id}/estimation-metadata", get(routes::estimation::get_metadata))
        .route("/estimations/compare", post(routes::estimation::compare))
        // Summaries
        .route(
            "/tasks/{id}/summary",
            get(routes::summary::get_summary).delete(routes::summary::delete_summary),
        )
        .route("/tasks/{id}/summary/generate", post(routes::summary::generate_summary))
        .route("/tasks/{id}/summary/quality", get(routes::summary::quality))
        // Parsing
        .route("/parse", post(routes::parse::parse_text))
        .route("/parse/suggestions", post(routes::parse::suggestions))
        .route("/tasks/from-text", post(routes::parse::create_from_text))
        // Provider
        .route("/provider", get(routes::provider::get_provider))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/tasks/{id}/estimation", get(websocket::estimation_ws))
        .route("/tasks/{id}/summary", get(websocket::summary_ws))
        .route("/tasks/parse", get(websocket::parse_ws))
        .route("/tasks/create", get(websocket::create_ws))
        .with_state(state);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .nest("/ws", ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Run the web server.
pub async fn run_server(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!("Web server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}
