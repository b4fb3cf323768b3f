use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Guesser asks the respondents something
    SendPrompt { text: String },
    /// Operator answers the pending prompt
    SubmitReply { text: String },
    /// Guesser picks which pseudonym is the human
    Guess { anon: Anon },
    ResetGame,
    /// Ask for the current view without waiting for a change
    Sync,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        server_now: String,
    },
    /// Full guesser view, pushed on every store change
    GuesserState {
        turns: Vec<GuesserTurn>,
        phase: CyclePhase,
        /// The two pseudonyms to choose from, once a pair is revealed
        options: Option<[Anon; 2]>,
    },
    /// Operator view: the log without AI turns
    OperatorState {
        turns: Vec<Turn>,
        can_respond: bool,
        username: Option<String>,
    },
    PromptAccepted,
    ReplyAccepted,
    GuessResult {
        anon: Anon,
        correct: bool,
        human_anon: Option<Anon>,
    },
    GameReset,
    Error {
        code: String,
        msg: String,
    },
}

impl From<GuessOutcome> for ServerMessage {
    fn from(outcome: GuessOutcome) -> Self {
        ServerMessage::GuessResult {
            anon: outcome.anon,
            correct: outcome.correct,
            human_anon: outcome.human_anon,
        }
    }
}

/// A turn as the guesser sees it (no origin, to prevent spoilers)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuesserTurn {
    Prompt { text: String },
    Reply { text: String, anon: Anon },
}

impl GuesserTurn {
    /// Unrevealed replies are hidden from the guesser
    pub fn from_turn(turn: &Turn) -> Option<Self> {
        match (turn.from, &turn.anon) {
            (TurnOrigin::User, _) => Some(GuesserTurn::Prompt {
                text: turn.text.clone(),
            }),
            (_, Some(anon)) => Some(GuesserTurn::Reply {
                text: turn.text.clone(),
                anon: anon.clone(),
            }),
            (_, None) => None,
        }
    }
}
