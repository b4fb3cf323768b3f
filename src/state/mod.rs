mod cycle;
pub mod export;
mod guess;
mod session;
mod views;

pub use cycle::{build_response_pair, can_respond, replace_tail};
pub use guess::{latest_pair, resolve_guess};

use crate::llm::{LlmConfig, LlmManager};
use crate::store::{SharedStore, StoreError};
use crate::types::*;
use crate::usernames::UsernameAssigner;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Errors reported back to a client when a game action is refused
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Still waiting for both replies to the last prompt")]
    PromptPending,

    #[error("There is no unanswered prompt to respond to")]
    CannotRespond,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// Stable code for the wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            GameError::EmptyMessage => "EMPTY_MESSAGE",
            GameError::PromptPending => "PROMPT_PENDING",
            GameError::CannotRespond => "CANNOT_RESPOND",
            GameError::Store(_) => "STORE_FAILED",
        }
    }
}

/// One prompt cycle: the epoch that owns it and the two reply slots
#[derive(Debug, Clone, Default)]
pub struct PromptCycle {
    /// Bumped on every accepted prompt and on reset; stale AI replies carry an old value
    pub epoch: u64,
    pub phase: CyclePhase,
    pub ai_reply: Option<String>,
    pub human_reply: Option<String>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SharedStore>,
    pub usernames: UsernameAssigner,
    pub cycle: Arc<RwLock<PromptCycle>>,
    pub llm: Option<Arc<LlmManager>>,
    pub llm_config: LlmConfig,
    pub config: GameConfig,
}

impl AppState {
    /// In-memory state without an AI provider (every AI reply falls back)
    pub fn new() -> Self {
        Self::new_with_llm(None, LlmConfig::default(), GameConfig::default())
    }

    /// In-memory state with the given provider and settings
    pub fn new_with_llm(
        llm: Option<LlmManager>,
        llm_config: LlmConfig,
        config: GameConfig,
    ) -> Self {
        Self::with_store(Arc::new(SharedStore::in_memory()), llm, llm_config, config)
    }

    pub fn with_store(
        store: Arc<SharedStore>,
        llm: Option<LlmManager>,
        llm_config: LlmConfig,
        config: GameConfig,
    ) -> Self {
        let usernames = UsernameAssigner::new(store.clone(), config.username_prefix.clone());
        Self {
            store,
            usernames,
            cycle: Arc::new(RwLock::new(PromptCycle::default())),
            llm: llm.map(Arc::new),
            llm_config,
            config,
        }
    }

    pub async fn cycle_phase(&self) -> CyclePhase {
        self.cycle.read().await.phase
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::llm::{GenerateRequest, GenerateResponse, LlmProvider, LlmResult, ResponseMetadata};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Replies with a fixed text once `gate` is notified
    pub struct GatedProvider {
        pub gate: Arc<Notify>,
        pub reply: String,
    }

    #[async_trait]
    impl LlmProvider for GatedProvider {
        async fn generate(&self, _request: GenerateRequest) -> LlmResult<GenerateResponse> {
            self.gate.notified().await;
            Ok(GenerateResponse {
                text: self.reply.clone(),
                metadata: ResponseMetadata {
                    provider: "gated".to_string(),
                    model: "test".to_string(),
                    tokens_used: None,
                    latency_ms: 0,
                },
            })
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    pub fn instant_config() -> GameConfig {
        GameConfig {
            ai_reply_delay: Duration::ZERO,
            state_file: None,
            ..GameConfig::default()
        }
    }

    /// State whose AI reply is held until the returned gate is notified
    pub fn gated_state(reply: &str) -> (AppState, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let provider = GatedProvider {
            gate: gate.clone(),
            reply: reply.to_string(),
        };
        let state = AppState::new_with_llm(
            Some(LlmManager::new(vec![Box::new(provider)])),
            LlmConfig::default(),
            instant_config(),
        );
        (state, gate)
    }

    pub async fn wait_for_idle(state: &AppState) {
        for _ in 0..200 {
            if state.cycle_phase().await == CyclePhase::Idle {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("prompt cycle never returned to idle");
    }
}
