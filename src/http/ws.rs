//! WebSocket transport.
//!
//! Each connection is served by one task that decodes and dispatches text
//! frames in arrival order, so responses keep request order.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use super::{dispatch_frame, HttpState};
use crate::mcp::codec::{self, ResponseOptions};
use crate::mcp::server::McpServer;

/// Upgrade handler for `/ws`.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<HttpState>) -> impl IntoResponse {
    let connection = Uuid::new_v4();
    ws.on_upgrade(move |socket| {
        handle_socket(socket, state).instrument(info_span!("ws", %connection))
    })
}

async fn handle_socket(mut socket: WebSocket, state: HttpState) {
    let metrics = state.server.metrics().clone();
    metrics.connection_opened();
    info!("WebSocket connection opened");

    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) => {
                debug!("Received frame: {}", text.as_str());
                let Some(reply) = process_text_frame(&state.server, text.as_str(), state.options).await
                else {
                    continue;
                };
                if let Err(e) = socket.send(Message::Text(reply.into())).await {
                    error!("Failed to send response: {}", e);
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("WebSocket connection closed by client");
                break;
            }
            Ok(_) => {
                // binary, ping and pong frames carry no requests
            }
            Err(e) => {
                error!("WebSocket error: {}", e);
                break;
            }
        }
    }

    metrics.connection_closed();
    info!("WebSocket connection ended");
}

/// Decode, dispatch and encode one text frame. Returns `None` when nothing
/// should be sent back.
pub async fn process_text_frame(
    server: &McpServer,
    text: &str,
    options: ResponseOptions,
) -> Option<String> {
    let (_, response) = dispatch_frame(server, text.as_bytes()).await?;
    match codec::encode_response(&response, options) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            None
        }
    }
}
