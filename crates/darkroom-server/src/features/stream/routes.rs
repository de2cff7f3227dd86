//! WebSocket routes

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::features::FeatureState;

pub fn stream_routes() -> Router<FeatureState> {
    Router::new().route("/images", get(upgrade))
}

async fn upgrade(State(state): State<FeatureState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| stream_events(socket, state))
}

/// Push progress events to one observer until either side hangs up.
/// Inbound text gets a pong so clients can probe the connection.
async fn stream_events(socket: WebSocket, state: FeatureState) {
    let (observer, mut events) = state.hub.subscribe().await;
    debug!(%observer, "websocket observer connected");

    let (mut sink, mut inbound) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(err) => {
                        warn!(%observer, error = %err, "could not serialize progress event");
                        continue;
                    }
                };
                if sink.send(Message::Text(frame)).await.is_err() {
                    break;
                }
            }
            message = inbound.next() => {
                match message {
                    Some(Ok(Message::Text(_))) => {
                        let pong = r#"{"type":"pong","message":"Connection alive"}"#;
                        if sink.send(Message::Text(pong.to_string())).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.hub.unsubscribe(observer).await;
    debug!(%observer, "websocket observer disconnected");
}
