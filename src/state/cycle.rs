//! Prompt cycle: accept a prompt, collect one AI and one human reply, then
//! reveal them as an anonymized, shuffled pair.

use super::{AppState, GameError, PromptCycle};
use crate::llm::GenerateRequest;
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;

/// True when the latest user turn has not been answered by the human yet
pub fn can_respond(turns: &[Turn]) -> bool {
    let last_user = turns.iter().rposition(|t| t.from == TurnOrigin::User);
    let last_human = turns.iter().rposition(|t| t.from == TurnOrigin::Human);

    match (last_user, last_human) {
        (Some(user), Some(human)) => user > human,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Tag both replies with the pool's pseudonyms and shuffle them.
///
/// Which pseudonym goes to which reply and the display order are both
/// uniform random permutations, so neither carries information about origin.
pub fn build_response_pair<R: Rng + ?Sized>(
    ai_text: String,
    human_text: String,
    pool: &[Anon; 2],
    rng: &mut R,
) -> [Turn; 2] {
    let mut anons = pool.clone();
    anons.shuffle(rng);
    let [ai_anon, human_anon] = anons;

    let mut pair = [
        Turn::revealed(ai_text, TurnOrigin::Ai, ai_anon),
        Turn::revealed(human_text, TurnOrigin::Human, human_anon),
    ];
    pair.shuffle(rng);
    pair
}

/// Replace everything after the latest user turn with `pair`
pub fn replace_tail(turns: &mut Vec<Turn>, pair: [Turn; 2]) {
    let keep = turns
        .iter()
        .rposition(|t| t.from == TurnOrigin::User)
        .map_or(0, |idx| idx + 1);
    turns.truncate(keep);
    turns.extend(pair);
}

impl AppState {
    /// Accept a guesser prompt and start soliciting both replies.
    /// Returns the epoch of the new cycle.
    pub async fn submit_prompt(&self, text: String) -> Result<u64, GameError> {
        if text.trim().is_empty() {
            return Err(GameError::EmptyMessage);
        }

        let mut cycle = self.cycle.write().await;
        if cycle.phase == CyclePhase::AwaitingBoth {
            tracing::info!("Rejecting prompt, epoch {} still pending", cycle.epoch);
            return Err(GameError::PromptPending);
        }

        let mut turns = self.store.read().await;
        turns.push(Turn::user(text.clone()));
        self.store.write(&turns).await?;

        cycle.epoch += 1;
        cycle.phase = CyclePhase::AwaitingBoth;
        cycle.ai_reply = None;
        cycle.human_reply = None;
        let epoch = cycle.epoch;
        drop(cycle);

        tracing::info!("Prompt accepted for epoch {}", epoch);
        self.spawn_ai_reply(epoch, text);
        Ok(epoch)
    }

    /// Ask the AI after the configured pre-delay and feed the answer into the join
    fn spawn_ai_reply(&self, epoch: u64, prompt: String) {
        let state = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(state.config.ai_reply_delay).await;
            let text = state.generate_ai_reply(&prompt).await;
            if let Err(e) = state.deliver_ai_reply(epoch, text).await {
                tracing::error!("Failed to record AI reply for epoch {}: {}", epoch, e);
            }
        });
    }

    /// One completion request; any failure becomes the fallback text
    pub async fn generate_ai_reply(&self, prompt: &str) -> String {
        let Some(llm) = &self.llm else {
            tracing::warn!("No LLM provider configured, using fallback AI reply");
            return AI_FALLBACK_TEXT.to_string();
        };

        let request = GenerateRequest::brief(prompt, &self.llm_config);
        match llm.generate(request).await {
            Ok(response) => response.text,
            Err(e) => {
                tracing::warn!("AI reply failed: {}", e);
                AI_FALLBACK_TEXT.to_string()
            }
        }
    }

    /// Fill the AI slot for `epoch`. Returns false if the cycle has moved on.
    pub async fn deliver_ai_reply(&self, epoch: u64, text: String) -> Result<bool, GameError> {
        let mut cycle = self.cycle.write().await;
        if cycle.epoch != epoch || cycle.phase != CyclePhase::AwaitingBoth {
            tracing::info!(
                "Discarding stale AI reply for epoch {} (current epoch {})",
                epoch,
                cycle.epoch
            );
            return Ok(false);
        }

        cycle.ai_reply = Some(text);
        self.try_join(&mut cycle).await?;
        Ok(true)
    }

    /// Record the operator's reply to the pending prompt
    pub async fn submit_human_reply(&self, text: String) -> Result<Turn, GameError> {
        if text.trim().is_empty() {
            return Err(GameError::EmptyMessage);
        }

        let username = self
            .usernames
            .assign(IdentityRole::HumanOperator)
            .await?;

        let mut cycle = self.cycle.write().await;
        let mut turns = self.store.read().await;
        if !can_respond(&turns) {
            return Err(GameError::CannotRespond);
        }

        let turn = Turn::human(text.clone(), username);
        turns.push(turn.clone());
        self.store.write(&turns).await?;

        if cycle.phase == CyclePhase::AwaitingBoth && cycle.human_reply.is_none() {
            cycle.human_reply = Some(text);
            self.try_join(&mut cycle).await?;
        }

        Ok(turn)
    }

    /// Reveal the pair once both slots are filled. Caller holds the cycle lock.
    async fn try_join(&self, cycle: &mut PromptCycle) -> Result<bool, GameError> {
        let (Some(ai), Some(human)) = (&cycle.ai_reply, &cycle.human_reply) else {
            tracing::debug!(
                "Epoch {} waiting: ai={}, human={}",
                cycle.epoch,
                cycle.ai_reply.is_some(),
                cycle.human_reply.is_some()
            );
            return Ok(false);
        };
        let (ai, human) = (ai.clone(), human.clone());

        let pool = self.usernames.anon_pool().await?;
        let pair = build_response_pair(ai, human, &pool, &mut rand::rng());

        let mut turns = self.store.read().await;
        replace_tail(&mut turns, pair);
        self.store.write(&turns).await?;

        cycle.ai_reply = None;
        cycle.human_reply = None;
        cycle.phase = CyclePhase::Idle;
        tracing::info!("Revealed response pair for epoch {}", cycle.epoch);
        Ok(true)
    }

    /// Pick up an unanswered prompt left in the store (after restart or import)
    pub async fn resume_pending_cycle(&self) -> Option<u64> {
        let mut cycle = self.cycle.write().await;
        let turns = self.store.read().await;
        let (epoch, prompt) = resume_locked(&mut cycle, &turns)?;
        drop(cycle);

        self.spawn_ai_reply(epoch, prompt);
        Some(epoch)
    }

    /// Like [`AppState::resume_pending_cycle`], for callers already holding the cycle lock
    pub(super) fn resume_with_lock(&self, cycle: &mut PromptCycle, turns: &[Turn]) -> Option<u64> {
        let (epoch, prompt) = resume_locked(cycle, turns)?;
        self.spawn_ai_reply(epoch, prompt);
        Some(epoch)
    }
}

/// Re-enter AwaitingBoth when `turns` ends in an unanswered prompt.
/// Returns the new epoch and the prompt to send to the AI.
fn resume_locked(cycle: &mut PromptCycle, turns: &[Turn]) -> Option<(u64, String)> {
    let last_user = turns.iter().rposition(|t| t.from == TurnOrigin::User)?;
    let tail = &turns[last_user + 1..];
    if tail.iter().any(|t| t.anon.is_some()) {
        return None;
    }

    cycle.epoch += 1;
    cycle.phase = CyclePhase::AwaitingBoth;
    cycle.ai_reply = None;
    cycle.human_reply = tail
        .iter()
        .find(|t| t.from == TurnOrigin::Human)
        .map(|t| t.text.clone());

    tracing::info!("Resuming unanswered prompt as epoch {}", cycle.epoch);
    Some((cycle.epoch, turns[last_user].text.clone()))
}
