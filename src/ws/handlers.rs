//! WebSocket message dispatch
//!
//! Role checks happen here, then messages go to the role-specific handler modules.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, GameError};
use crate::types::Role;
use std::sync::Arc;

use super::{guesser, operator};

/// Return early with UNAUTHORIZED unless the connection has the expected role
macro_rules! check_role {
    ($role:expr, $expected:expr, $action:expr) => {
        if *$role != $expected {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only the {:?} can {}", $expected, $action).to_lowercase(),
            });
        }
    };
}

/// Map a refused game action onto the wire
pub(super) fn game_error(e: GameError) -> ServerMessage {
    if let GameError::Store(ref inner) = e {
        tracing::error!("Store failure: {}", inner);
    }
    ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::SendPrompt { text } => {
            check_role!(role, Role::Guesser, "send prompts");
            guesser::handle_send_prompt(state, text).await
        }

        ClientMessage::Guess { anon } => {
            check_role!(role, Role::Guesser, "guess");
            guesser::handle_guess(state, anon).await
        }

        ClientMessage::SubmitReply { text } => {
            check_role!(role, Role::Operator, "submit replies");
            operator::handle_submit_reply(state, text).await
        }

        ClientMessage::ResetGame => handle_reset_game(state, role).await,

        ClientMessage::Sync => Some(state.view_for(*role).await),
    }
}

async fn handle_reset_game(state: &Arc<AppState>, role: &Role) -> Option<ServerMessage> {
    tracing::info!("{:?} resetting game", role);
    match state.reset_game().await {
        Ok(_) => Some(ServerMessage::GameReset),
        Err(e) => Some(game_error(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operator_cannot_send_prompt() {
        let state = Arc::new(AppState::new());

        let result = handle_message(
            ClientMessage::SendPrompt {
                text: "hi".to_string(),
            },
            &Role::Operator,
            &state,
        )
        .await;

        match result {
            Some(ServerMessage::Error { code, msg }) => {
                assert_eq!(code, "UNAUTHORIZED");
                assert!(msg.contains("guesser"));
            }
            other => panic!("Expected Error message, got {:?}", other),
        }
        assert!(state.store.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_guesser_cannot_submit_reply() {
        let state = Arc::new(AppState::new());

        let result = handle_message(
            ClientMessage::SubmitReply {
                text: "hi".to_string(),
            },
            &Role::Guesser,
            &state,
        )
        .await;

        assert!(matches!(result, Some(ServerMessage::Error { code, .. }) if code == "UNAUTHORIZED"));
    }

    #[tokio::test]
    async fn test_sync_returns_role_view() {
        let state = Arc::new(AppState::new());

        let guesser = handle_message(ClientMessage::Sync, &Role::Guesser, &state).await;
        assert!(matches!(guesser, Some(ServerMessage::GuesserState { .. })));

        let operator = handle_message(ClientMessage::Sync, &Role::Operator, &state).await;
        assert!(matches!(operator, Some(ServerMessage::OperatorState { .. })));
    }

    #[tokio::test]
    async fn test_either_role_can_reset() {
        let state = Arc::new(AppState::new());
        for role in [Role::Guesser, Role::Operator] {
            let result = handle_message(ClientMessage::ResetGame, &role, &state).await;
            assert!(matches!(result, Some(ServerMessage::GameReset)));
        }
    }
}
