//! Human operator message handlers

use super::handlers::game_error;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

pub async fn handle_submit_reply(state: &Arc<AppState>, text: String) -> Option<ServerMessage> {
    tracing::info!("Operator reply submitted: {}", text);
    match state.submit_human_reply(text).await {
        Ok(_) => Some(ServerMessage::ReplyAccepted),
        Err(e) => Some(game_error(e)),
    }
}
