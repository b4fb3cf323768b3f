use super::{can_respond, latest_pair, AppState};
use crate::protocol::{GuesserTurn, ServerMessage};
use crate::types::*;

impl AppState {
    /// What a connection with `role` should currently display
    pub async fn view_for(&self, role: Role) -> ServerMessage {
        match role {
            Role::Guesser => self.guesser_view().await,
            Role::Operator => self.operator_view().await,
        }
    }

    pub async fn guesser_view(&self) -> ServerMessage {
        let phase = self.cycle_phase().await;
        let turns = self.store.read().await;

        ServerMessage::GuesserState {
            options: latest_pair(&turns).map(|pair| pair.anons),
            turns: turns.iter().filter_map(GuesserTurn::from_turn).collect(),
            phase,
        }
    }

    pub async fn operator_view(&self) -> ServerMessage {
        let username = match self.usernames.assign(IdentityRole::HumanOperator).await {
            Ok(name) => Some(name),
            Err(e) => {
                tracing::warn!("Could not assign operator username: {}", e);
                None
            }
        };
        let turns = self.store.read().await;

        ServerMessage::OperatorState {
            can_respond: can_respond(&turns),
            turns: turns
                .into_iter()
                .filter(|t| t.from != TurnOrigin::Ai)
                .collect(),
            username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_state() -> AppState {
        let state = AppState::new();
        state
            .store
            .write(&[
                Turn::user("q1"),
                Turn::revealed("x", TurnOrigin::Ai, "userAAAA"),
                Turn::revealed("y", TurnOrigin::Human, "userBBBB"),
                Turn::user("q2"),
                Turn::human("pending", "userHHHH"),
            ])
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_guesser_view_hides_origin_and_pending_reply() {
        let state = seeded_state().await;

        match state.view_for(Role::Guesser).await {
            ServerMessage::GuesserState {
                turns,
                phase,
                options,
            } => {
                assert_eq!(turns.len(), 4);
                assert!(matches!(&turns[3], GuesserTurn::Prompt { text } if text == "q2"));
                assert_eq!(phase, CyclePhase::Idle);
                // A new prompt is out, so the old pair is no longer guessable
                assert!(options.is_none());
            }
            other => panic!("Expected GuesserState, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_guesser_view_offers_options() {
        let state = AppState::new();
        state
            .store
            .write(&[
                Turn::user("q"),
                Turn::revealed("x", TurnOrigin::Ai, "userAAAA"),
                Turn::revealed("y", TurnOrigin::Human, "userBBBB"),
            ])
            .await
            .unwrap();

        match state.guesser_view().await {
            ServerMessage::GuesserState { options, .. } => {
                assert_eq!(
                    options,
                    Some(["userAAAA".to_string(), "userBBBB".to_string()])
                );
            }
            other => panic!("Expected GuesserState, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_operator_view_excludes_ai_turns() {
        let state = seeded_state().await;

        match state.view_for(Role::Operator).await {
            ServerMessage::OperatorState {
                turns,
                can_respond,
                username,
            } => {
                assert!(turns.iter().all(|t| t.from != TurnOrigin::Ai));
                assert_eq!(turns.len(), 4);
                assert!(!can_respond);
                assert!(username.is_some());
            }
            other => panic!("Expected OperatorState, got {:?}", other),
        }
    }
}
