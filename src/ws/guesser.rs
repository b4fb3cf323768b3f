//! Guesser message handlers

use super::handlers::game_error;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;

pub async fn handle_send_prompt(state: &Arc<AppState>, text: String) -> Option<ServerMessage> {
    tracing::info!("Prompt submitted: {}", text);
    match state.submit_prompt(text).await {
        Ok(_) => Some(ServerMessage::PromptAccepted),
        Err(e) => Some(game_error(e)),
    }
}

/// Unknown identifiers and guesses without a pair get no response
pub async fn handle_guess(state: &Arc<AppState>, anon: String) -> Option<ServerMessage> {
    state.guess(&anon).await.map(ServerMessage::from)
}
