use crate::api::AppState;
use crate::bus::WatchEvent;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// GET /api/ws - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Connection lifecycle: an init snapshot, then the live event stream.
/// A slow client lags (skips events) rather than stalling the pipeline.
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut events = state.bus.subscribe();

    // Initial state snapshot, mirroring what observers poll over HTTP
    let init = json!({
        "type": "init",
        "cameras": state.coordinator.cameras(),
        "threats": state.coordinator.store().active_threats(),
    });
    if let Ok(text) = serde_json::to_string(&init) {
        if socket.send(Message::Text(text)).await.is_err() {
            return;
        }
    }

    info!("WebSocket connection established");

    loop {
        tokio::select! {
            // Client messages: ping/pong and disconnect
            maybe = socket.recv() => {
                match maybe {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Ignore text, binary, pong messages
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            // Pipeline events from the bus
            result = events.recv() => {
                match result {
                    Ok(event) => {
                        if let Err(e) = forward_event(&mut socket, &event).await {
                            error!(error = %e, "Failed to send event");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "WebSocket lagged, skipped events");
                        // Continue processing
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Event bus closed");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

async fn forward_event(socket: &mut WebSocket, event: &WatchEvent) -> anyhow::Result<()> {
    let text = serde_json::to_string(event)?;
    socket.send(Message::Text(text)).await?;
    Ok(())
}
