use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pseudonymous identifier shown to the guesser (e.g. "userQXTB")
pub type Anon = String;

/// Where a turn came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnOrigin {
    User,
    Ai,
    Human,
}

/// One entry in the shared message log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub text: String,
    pub from: TurnOrigin,
    /// Set once the turn is part of a revealed response pair
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anon: Option<Anon>,
    /// Operator identifier, only on human-originated turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from: TurnOrigin::User,
            anon: None,
            username: None,
        }
    }

    pub fn human(text: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from: TurnOrigin::Human,
            anon: None,
            username: Some(username.into()),
        }
    }

    /// A reply that has been assigned a pseudonym for the reveal
    pub fn revealed(text: impl Into<String>, from: TurnOrigin, anon: impl Into<Anon>) -> Self {
        Self {
            text: text.into(),
            from,
            anon: Some(anon.into()),
            username: None,
        }
    }
}

/// WebSocket connection role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sends prompts and guesses who the human is
    Guesser,
    /// The human hiding among the respondents
    Operator,
}

/// Roles that get a cached pseudonym for the whole session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityRole {
    HumanOperator,
    Ai,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Ready for the next prompt
    #[default]
    Idle,
    /// A prompt is out; waiting for the AI and the human reply
    AwaitingBoth,
}

/// The latest revealed pair. Never sent to the guesser as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePair {
    pub anons: [Anon; 2],
    pub which_is_human: Option<Anon>,
}

impl ResponsePair {
    pub fn contains(&self, anon: &str) -> bool {
        self.anons.iter().any(|a| a == anon)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuessOutcome {
    pub anon: Anon,
    pub correct: bool,
    pub human_anon: Option<Anon>,
}

/// Shown in the AI slot when the completion call fails
pub const AI_FALLBACK_TEXT: &str = "⚠️ AI error. Try again.";

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// "Thinking time" before the completion request goes out
    pub ai_reply_delay: Duration,
    /// Where the store is persisted (None = memory only)
    pub state_file: Option<String>,
    pub username_prefix: String,
    pub port: u16,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            ai_reply_delay: Duration::from_millis(1200),
            state_file: Some("imitation-state.json".to_string()),
            username_prefix: "user".to_string(),
            // 6573 is ascii for "AI"
            port: 6573,
        }
    }
}

impl GameConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ai_reply_delay = std::env::var("AI_REPLY_DELAY_MS")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.ai_reply_delay);

        let state_file = match std::env::var("STATE_FILE") {
            Ok(path) => {
                let trimmed = path.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(_) => defaults.state_file,
        };

        let username_prefix = std::env::var("USERNAME_PREFIX")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.username_prefix);

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        Self {
            ai_reply_delay,
            state_file,
            username_prefix,
            port,
        }
    }
}
