mod guesser;
pub mod handlers;
mod operator;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub role: Option<String>,
}

/// Anything other than `role=operator` connects as the guesser
pub fn parse_role(raw: Option<&str>) -> Role {
    match raw {
        Some("operator") => Role::Operator,
        _ => Role::Guesser,
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let role = parse_role(params.role.as_deref());
    tracing::info!("WebSocket connection request: role={:?}", role);

    ws.on_upgrade(move |socket| handle_socket(socket, role, state))
}

/// `/ws/operator`: same as `/ws?role=operator`
pub async fn ws_operator_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request: role={:?}", Role::Operator);
    ws.on_upgrade(move |socket| handle_socket(socket, Role::Operator, state))
}

/// Serialize and send; false once the peer is gone
async fn send_message(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, role: Role, state: Arc<AppState>) {
    let conn_id = ulid::Ulid::new();
    let (mut sender, mut receiver) = socket.split();

    tracing::info!("WebSocket {} connected with role: {:?}", conn_id, role);

    // Subscribe before the first view so no change slips in between
    let mut changes = state.store.subscribe();

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        role,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_message(&mut sender, &welcome).await
        || !send_message(&mut sender, &state.view_for(role).await).await
    {
        tracing::error!("Failed to send welcome message to {}", conn_id);
        return;
    }

    loop {
        tokio::select! {
            // Every store change pushes a fresh view
            change = changes.recv() => {
                match change {
                    Ok(change) => {
                        tracing::debug!("Store key {} changed, refreshing {}", change.key, conn_id);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Connection {} lagged {} store changes", conn_id, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
                if !send_message(&mut sender, &state.view_for(role).await).await {
                    break;
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message from {}: {}", conn_id, text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => handlers::handle_message(client_msg, &role, &state).await,
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            if !send_message(&mut sender, &response).await {
                                tracing::error!("Failed to send response to {}", conn_id);
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket {} closed", conn_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket {} error: {}", conn_id, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!("WebSocket connection {} closed for role: {:?}", conn_id, role);
}
