//! Websocket push of engine events
//!
//! Every event the dispatcher handles is forwarded to connected clients as a
//! JSON text frame: `{"kind": "OUTPUT_ADD", "body": {"type": "output", "data": {...}}}`.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use mg_core::Event;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// What a subscriber should do with the next broadcast result
#[derive(Debug, PartialEq)]
enum Push {
    Frame(String),
    Skip,
    Close,
}

fn welcome_frame() -> String {
    json!({
        "type": "welcome",
        "server": "mediagate",
        "version": env!("CARGO_PKG_VERSION"),
    })
    .to_string()
}

fn lagged_frame(skipped: u64) -> String {
    json!({ "type": "lagged", "skipped": skipped }).to_string()
}

fn push_for(received: Result<Event, RecvError>) -> Push {
    match received {
        Ok(event) => match serde_json::to_string(&event) {
            Ok(frame) => Push::Frame(frame),
            Err(e) => {
                warn!(kind = %event.kind, error = %e, "Failed to encode event for push");
                Push::Skip
            }
        },
        Err(RecvError::Lagged(skipped)) => {
            warn!(skipped, "Websocket client lagging; events dropped");
            Push::Frame(lagged_frame(skipped))
        }
        Err(RecvError::Closed) => Push::Close,
    }
}

async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    info!("Websocket client connected");
    let mut events = state.manager.subscribe();
    let (mut sender, mut receiver) = socket.split();

    if sender.send(Message::Text(welcome_frame())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            received = events.recv() => match push_for(received) {
                Push::Frame(frame) => {
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Push::Skip => {}
                Push::Close => break,
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "Websocket error");
                    break;
                }
            },
        }
    }

    info!("Websocket connection closed");
}
