//! WebSocket progress streaming.

pub mod protocol;
pub mod session;

pub use protocol::{ProgressTracker, SessionEvent};
pub use session::{Session, SessionKind};

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::AppState;
use protocol::AUTH_REQUIRED_CLOSE_CODE;

pub async fn estimation_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, SessionKind::Estimation { task_id }, state))
}

pub async fn summary_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, SessionKind::Summary { task_id }, state))
}

pub async fn parse_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, SessionKind::Parse, state))
}

pub async fn create_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, SessionKind::Create, state))
}

/// Drive one connection: forward session events to the client and feed
/// client frames to the session in order.
async fn handle_socket(socket: WebSocket, kind: SessionKind, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    if kind.requires_authentication() {
        warn!(?kind, "unauthenticated WebSocket connection attempt");
        let frame = CloseFrame {
            code: AUTH_REQUIRED_CLOSE_CODE,
            reason: "Authentication required".into(),
        };
        let _ = sender.send(Message::Close(Some(frame))).await;
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();

    // Forward session events to this client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = event.to_json();
            debug!(message = %json, "Sending message to WebSocket client");
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                break;
            }
        }
    });

    let session = Session::new(kind, state, tx);
    session.open();

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => session.handle_text(text.as_str()).await,
            Message::Close(_) => {
                debug!("WebSocket client sent close frame");
                break;
            }
            _ => {}
        }
    }

    info!(kind = ?session.kind(), "WebSocket client disconnected");
    // Dropping the session closes the channel and ends the forwarder
    drop(session);
    let _ = send_task.await;
}
